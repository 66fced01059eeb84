use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;

use crate::error::Error;
use crate::split::{WSReader, WSWriter};

/// A handshaken connection: a stream of decoded payloads plus a framed
/// writer, splittable so the two halves can live on different tasks.
pub struct WSConnection {
    reader: WSReader,
    writer: WSWriter,
}

impl WSConnection {
    pub(crate) fn new(reader: WSReader, writer: WSWriter) -> Self {
        Self { reader, writer }
    }

    // Splitting the connection, so incoming messages can be monitored in a
    // separate task while the writer is handed over to the dispatch side.
    pub fn split(self) -> (WSReader, WSWriter) {
        (self.reader, self.writer)
    }

    pub async fn send_message(&mut self, payload: &[u8]) -> Result<(), Error> {
        self.writer.send(payload).await
    }
}

impl Stream for WSConnection {
    type Item = Result<Bytes, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        Pin::new(&mut this.reader).poll_next(cx)
    }
}
