use std::io;

use httparse::Error as HttpParseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("channel communication error")]
    CommunicationError,

    // General Errors
    #[error("IO Error happened: {source}")]
    IOError {
        #[from]
        source: io::Error,
    },

    #[error("connection closed by the peer")]
    ConnectionClosed,

    // Handshake Errors
    #[error("Invalid handshake request method and version")]
    InvalidHTTPHandshake,

    #[error("Upgrade: websocket header missing in the request")]
    NoUpgradeHeaderPresent,

    #[error("Host header missing in the request")]
    NoHostHeaderPresent,

    #[error("Origin header missing in the request")]
    NoOriginHeaderPresent,

    #[error("Couldn't find Sec-WebSocket-Key header in the request")]
    NoSecWebsocketKey,

    #[error("Sec-WebSocket-Key{0} is not a valid draft-76 key")]
    InvalidHixieKey(u8),

    #[error("draft-76 handshake is missing its 8 trailing key bytes")]
    MissingHixieKey3,

    #[error("Incomplete HTTP request")]
    IncompleteHTTPRequest,

    #[error("{source}")]
    HttpParseError {
        #[from]
        source: HttpParseError,
    },

    // Framing Errors
    #[error("Invalid Opcode: {0:#x}")]
    InvalidOpcode(u8),

    #[error("draft-76 frame must begin with 0xFF, got {0:#x}")]
    InvalidFrameStart(u8),

    #[error("Max frame size reached")]
    MaxFrameSize,
}
