use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::Error;
use crate::frame::Dialect;
use crate::write::Writer;

/// The receive half handed to the server's forwarder task: a stream of
/// decoded payloads, ending when the read task ends.
pub struct WSReader {
    read_rx: ReceiverStream<Result<Bytes, Error>>,
}

impl WSReader {
    pub(crate) fn new(read_rx: ReceiverStream<Result<Bytes, Error>>) -> Self {
        Self { read_rx }
    }
}

impl Stream for WSReader {
    type Item = Result<Bytes, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        Pin::new(&mut this.read_rx).poll_next(cx)
    }
}

/// The send half, owned by whoever fans messages out. With heartbeats and
/// close replies out of scope there is exactly one writer per peer, so no
/// lock sits in front of the socket.
pub struct WSWriter {
    writer: Writer,
}

impl WSWriter {
    pub(crate) fn new(writer: Writer) -> Self {
        Self { writer }
    }

    pub fn dialect(&self) -> Dialect {
        self.writer.dialect()
    }

    pub async fn send(&mut self, payload: &[u8]) -> Result<(), Error> {
        self.writer.write_message(payload).await
    }
}
