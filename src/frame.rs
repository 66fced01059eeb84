use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Text,
    Binary,
    Close,
}

impl OpCode {
    pub fn from(byte: u8) -> Result<Self, Error> {
        match byte {
            0x1 => Ok(OpCode::Text),
            0x2 => Ok(OpCode::Binary),
            0x8 => Ok(OpCode::Close),
            // Continue/Ping/Pong are deliberately not handled: this broker
            // never fragments and never negotiates heartbeats, so a frame
            // carrying them is treated as any other unknown opcode.
            other => Err(Error::InvalidOpcode(other)),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            OpCode::Text => 0x1,
            OpCode::Binary => 0x2,
            OpCode::Close => 0x8,
        }
    }
}

/// Which wire dialect a connection negotiated during the handshake.
///
/// Decoding and encoding dispatch on this value. The legacy draft dialect
/// (`0xFF payload 0x00` framing, MD5 key exchange) is still spoken by a few
/// embedded clients, so both stay supported on the same port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Rfc6455,
    Hixie76,
}
