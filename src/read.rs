use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncReadExt, ReadHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc::Sender;

use crate::config::WebSocketConfig;
use crate::decoder::{HixieDecoder, HixieState, ParseItem, ParseState, Paused, RfcDecoder};
use crate::error::Error;
use crate::frame::Dialect;

// The snapshot carried between socket reads, one variant per dialect.
enum DecodeState {
    Rfc(Option<Paused<ParseState>>),
    Hixie(Option<Paused<HixieState>>),
}

/// The receive side of a connection: socket reads land in `recv_buf`, the
/// dialect's incremental decoder drains every complete frame out of it, and
/// decoded payloads go down the channel toward the event stream.
pub struct ReadStream {
    read_half: ReadHalf<TcpStream>,
    recv_buf: BytesMut,
    decode_state: DecodeState,
    pub read_tx: Sender<Result<Bytes, Error>>,
    config: WebSocketConfig,
}

impl ReadStream {
    pub fn new(
        read_half: ReadHalf<TcpStream>,
        dialect: Dialect,
        leftover: BytesMut,
        read_tx: Sender<Result<Bytes, Error>>,
        config: WebSocketConfig,
    ) -> Self {
        let decode_state = match dialect {
            Dialect::Rfc6455 => DecodeState::Rfc(None),
            Dialect::Hixie76 => DecodeState::Hixie(None),
        };
        Self {
            read_half,
            recv_buf: leftover,
            decode_state,
            read_tx,
            config,
        }
    }

    /// One bounded socket read per step, then as many complete frames as the
    /// buffer yields. A partial frame survives in the decode snapshot until
    /// the next read; a zero-byte read is the peer hanging up.
    pub async fn poll_messages(&mut self) -> Result<(), Error> {
        // frames that arrived piggybacked on the handshake bytes
        self.drain_and_forward().await?;

        let mut chunk = vec![0u8; self.config.read_chunk_size];
        loop {
            let read = self.read_half.read(&mut chunk).await?;
            if read == 0 {
                return Err(Error::ConnectionClosed);
            }
            self.recv_buf.extend_from_slice(&chunk[..read]);
            self.drain_and_forward().await?;
        }
    }

    async fn drain_and_forward(&mut self) -> Result<(), Error> {
        for payload in self.drain_messages()? {
            self.read_tx
                .send(Ok(payload))
                .await
                .map_err(|_| Error::CommunicationError)?;
        }
        Ok(())
    }

    fn drain_messages(&mut self) -> Result<Vec<Bytes>, Error> {
        let mut messages = Vec::new();
        let trim_index;
        match &mut self.decode_state {
            DecodeState::Rfc(resume) => {
                let decoder = match resume.take() {
                    Some(paused) => RfcDecoder::resume(&self.recv_buf, paused),
                    None => RfcDecoder::new(&self.recv_buf),
                };
                let mut consumed = 0;
                for item in decoder {
                    match item? {
                        ParseItem::Message { payload, trim_index } => {
                            messages.push(Bytes::from(payload));
                            consumed = trim_index;
                        }
                        ParseItem::Paused(paused) => {
                            consumed = paused.trim_index;
                            *resume = Some(paused);
                        }
                    }
                }
                trim_index = consumed;
            }
            DecodeState::Hixie(resume) => {
                let decoder = match resume.take() {
                    Some(paused) => HixieDecoder::resume(&self.recv_buf, paused),
                    None => HixieDecoder::new(&self.recv_buf),
                };
                let mut consumed = 0;
                for item in decoder {
                    match item? {
                        ParseItem::Message { payload, trim_index } => {
                            messages.push(Bytes::from(payload));
                            consumed = trim_index;
                        }
                        ParseItem::Paused(paused) => {
                            consumed = paused.trim_index;
                            *resume = Some(paused);
                        }
                    }
                }
                trim_index = consumed;
            }
        }
        self.recv_buf.advance(trim_index);
        self.enforce_frame_size()?;
        Ok(messages)
    }

    // An oversized frame announcement is caught as soon as its length field
    // parses, long before the payload would have been buffered.
    fn enforce_frame_size(&self) -> Result<(), Error> {
        let Some(max_frame_size) = self.config.max_frame_size else {
            return Ok(());
        };
        let pending = match &self.decode_state {
            DecodeState::Rfc(Some(paused)) => match paused.state {
                ParseState::NeedMask { remaining }
                | ParseState::NeedPayload { remaining, .. } => remaining,
                _ => 0,
            },
            DecodeState::Hixie(Some(paused)) => paused.partial.len() as u64,
            _ => 0,
        };
        if pending > max_frame_size as u64 {
            return Err(Error::MaxFrameSize);
        }
        Ok(())
    }
}
