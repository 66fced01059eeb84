use tokio::io::{AsyncWriteExt, WriteHalf};
use tokio::net::TcpStream;

use crate::encoder::{encode_hixie, encode_rfc};
use crate::error::Error;
use crate::frame::Dialect;

/// The send side of a connection. Every message goes out as a single framed
/// write in the dialect negotiated at handshake time.
pub struct Writer {
    write_half: WriteHalf<TcpStream>,
    dialect: Dialect,
}

impl Writer {
    pub fn new(write_half: WriteHalf<TcpStream>, dialect: Dialect) -> Self {
        Self { write_half, dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub async fn write_message(&mut self, payload: &[u8]) -> Result<(), Error> {
        let frame = match self.dialect {
            Dialect::Rfc6455 => encode_rfc(payload),
            Dialect::Hixie76 => encode_hixie(payload),
        };
        self.write_half.write_all(&frame).await?;
        Ok(())
    }
}
