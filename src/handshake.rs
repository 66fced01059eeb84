use base64::prelude::*;
use bytes::{Buf, BytesMut};
use sha1::{Digest, Sha1};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};
use tokio_stream::wrappers::ReceiverStream;

use crate::config::WebSocketConfig;
use crate::connection::WSConnection;
use crate::error::Error;
use crate::frame::Dialect;
use crate::read::ReadStream;
use crate::split::{WSReader, WSWriter};
use crate::write::Writer;

const RFC_MAGIC_KEY: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

const SWITCHING_PROTOCOLS: &str =
    "HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n";

// Limit the maximum amount of header data read, and the time spent waiting
// for it, to prevent a denial of service attack.
const MAX_HEADER_SIZE: usize = 1024 * 16; // 16 kilobytes
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

// The draft-76 handshake trails 8 challenge bytes after the blank line.
const HIXIE_KEY3_LEN: usize = 8;

// The headers this server cares about, pulled out of the httparse view so
// the receive buffer can keep moving while the handshake is computed.
struct UpgradeRequest {
    upgrade: Option<String>,
    host: Option<String>,
    origin: Option<String>,
    key: Option<String>,
    key1: Option<String>,
    key2: Option<String>,
}

pub async fn accept_async(stream: TcpStream) -> Result<WSConnection, Error> {
    accept_async_with_config(stream, WebSocketConfig::default()).await
}

/// Performs the server side of the opening handshake and hands back a
/// connection ready for framed traffic.
///
/// Requests carrying both `Sec-WebSocket-Key1` and `Sec-WebSocket-Key2` are
/// answered in the legacy Hixie-76 dialect (MD5 challenge digest after the
/// 101), everything else in RFC 6455 (`Sec-WebSocket-Accept`). A request
/// that does not ask for a websocket upgrade is dropped without any response
/// bytes. Bytes that arrive pipelined behind the handshake are kept and
/// decoded as the first frames of the connection.
pub async fn accept_async_with_config(
    mut stream: TcpStream,
    config: WebSocketConfig,
) -> Result<WSConnection, Error> {
    let mut buf = BytesMut::with_capacity(1024);
    let header_end = read_until_headers_end(&mut stream, &mut buf).await?;

    let request = parse_upgrade_request(&buf[..header_end + 4])?;
    buf.advance(header_end + 4);

    let upgrade = request.upgrade.as_deref().unwrap_or_default();
    if !upgrade.eq_ignore_ascii_case("websocket") {
        return Err(Error::NoUpgradeHeaderPresent);
    }

    let (dialect, response) = match (&request.key1, &request.key2) {
        (Some(key1), Some(key2)) => {
            // the challenge needs all 8 trailing bytes, which may not have
            // been in the same read as the headers
            while buf.len() < HIXIE_KEY3_LEN {
                let read = timeout(HANDSHAKE_TIMEOUT, stream.read_buf(&mut buf))
                    .await
                    .map_err(|_| Error::MissingHixieKey3)??;
                if read == 0 {
                    return Err(Error::MissingHixieKey3);
                }
            }
            let host = request.host.clone().ok_or(Error::NoHostHeaderPresent)?;
            let origin = request.origin.clone().ok_or(Error::NoOriginHeaderPresent)?;
            let digest = hixie_challenge_digest(key1, key2, &buf[..HIXIE_KEY3_LEN])?;
            buf.advance(HIXIE_KEY3_LEN);

            let mut response = format!(
                "{SWITCHING_PROTOCOLS}Sec-WebSocket-Origin: {origin}\r\nSec-WebSocket-Location: ws://{host}/\r\n\r\n"
            )
            .into_bytes();
            response.extend_from_slice(&digest);
            (Dialect::Hixie76, response)
        }
        _ => {
            let key = request.key.clone().ok_or(Error::NoSecWebsocketKey)?;
            let accept_value = generate_websocket_accept_value(&key);
            let response =
                format!("{SWITCHING_PROTOCOLS}Sec-WebSocket-Accept: {accept_value}\r\n\r\n")
                    .into_bytes();
            (Dialect::Rfc6455, response)
        }
    };

    stream.write_all(&response).await?;

    let (read_half, write_half) = tokio::io::split(stream);
    let writer = Writer::new(write_half, dialect);
    let (read_tx, read_rx) = mpsc::channel(100);
    let mut read_stream = ReadStream::new(read_half, dialect, buf, read_tx, config);

    tokio::spawn(async move {
        if let Err(err) = read_stream.poll_messages().await {
            match err {
                // a clean close just ends the stream
                Error::ConnectionClosed => {}
                other => {
                    let _ = read_stream.read_tx.send(Err(other)).await;
                }
            }
        }
    });

    Ok(WSConnection::new(
        WSReader::new(ReceiverStream::new(read_rx)),
        WSWriter::new(writer),
    ))
}

async fn read_until_headers_end(
    stream: &mut TcpStream,
    buf: &mut BytesMut,
) -> Result<usize, Error> {
    loop {
        if let Some(index) = find_headers_end(buf) {
            return Ok(index);
        }
        if buf.len() > MAX_HEADER_SIZE {
            return Err(Error::IncompleteHTTPRequest);
        }
        let read = timeout(HANDSHAKE_TIMEOUT, stream.read_buf(buf))
            .await
            .map_err(|_| Error::IncompleteHTTPRequest)??;
        if read == 0 {
            return Err(Error::IncompleteHTTPRequest);
        }
    }
}

fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|window| window == b"\r\n\r\n")
}

fn parse_upgrade_request(raw: &[u8]) -> Result<UpgradeRequest, Error> {
    let mut headers = [httparse::EMPTY_HEADER; 32];
    let mut request = httparse::Request::new(&mut headers);
    if request.parse(raw)?.is_partial() {
        return Err(Error::IncompleteHTTPRequest);
    }
    if request.method != Some("GET") || request.version != Some(1) {
        return Err(Error::InvalidHTTPHandshake);
    }
    Ok(UpgradeRequest {
        upgrade: header_value(request.headers, "Upgrade"),
        host: header_value(request.headers, "Host"),
        origin: header_value(request.headers, "Origin"),
        key: header_value(request.headers, "Sec-WebSocket-Key"),
        key1: header_value(request.headers, "Sec-WebSocket-Key1"),
        key2: header_value(request.headers, "Sec-WebSocket-Key2"),
    })
}

fn header_value(headers: &[httparse::Header], name: &str) -> Option<String> {
    headers
        .iter()
        .find(|header| header.name.eq_ignore_ascii_case(name))
        .map(|header| String::from_utf8_lossy(header.value).trim().to_string())
}

pub(crate) fn generate_websocket_accept_value(key: &str) -> String {
    let mut sha1 = Sha1::new();
    sha1.update(key.as_bytes());
    sha1.update(RFC_MAGIC_KEY.as_bytes());
    BASE64_STANDARD.encode(sha1.finalize())
}

/// A draft-76 key folds to a number: the digit characters concatenated,
/// parsed as decimal, divided by the count of space characters. A key with
/// no digits or no spaces is malformed.
pub(crate) fn hixie_key_number(key: &str, which: u8) -> Result<u32, Error> {
    let digits: String = key.chars().filter(char::is_ascii_digit).collect();
    let spaces = key.chars().filter(|c| *c == ' ').count() as u64;
    if digits.is_empty() || spaces == 0 {
        return Err(Error::InvalidHixieKey(which));
    }
    let number: u64 = digits.parse().map_err(|_| Error::InvalidHixieKey(which))?;
    Ok((number / spaces) as u32)
}

/// MD5 over `be32(key1 number) ++ be32(key2 number) ++ key3`.
pub(crate) fn hixie_challenge_digest(
    key1: &str,
    key2: &str,
    key3: &[u8],
) -> Result<[u8; 16], Error> {
    let number1 = hixie_key_number(key1, 1)?;
    let number2 = hixie_key_number(key2, 2)?;
    let mut challenge = Vec::with_capacity(16);
    challenge.extend_from_slice(&number1.to_be_bytes());
    challenge.extend_from_slice(&number2.to_be_bytes());
    challenge.extend_from_slice(key3);
    Ok(md5::compute(&challenge).0)
}
