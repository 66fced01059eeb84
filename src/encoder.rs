use crate::frame::OpCode;

const LEN_U16_MARKER: u8 = 126;
const LEN_U64_MARKER: u8 = 127;
const MASK_BIT: u8 = 0b1000_0000;

/// Builds a server-to-client RFC 6455 text frame: FIN + text opcode, the
/// short/extended big-endian length forms, no mask, payload verbatim.
pub fn encode_rfc(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + 10);
    frame.push(0b1000_0000 | OpCode::Text.as_u8());
    push_length(&mut frame, payload.len(), false);
    frame.extend_from_slice(payload);
    frame
}

/// Builds a client-shaped frame: mask bit set, the 4 mask bytes on the wire,
/// and every payload byte XOR'd with `mask[i % 4]`. Servers never mask, so
/// this exists for test clients and load tooling talking to the broker.
pub fn encode_rfc_masked(payload: &[u8], mask: [u8; 4]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + 14);
    frame.push(0b1000_0000 | OpCode::Text.as_u8());
    push_length(&mut frame, payload.len(), true);
    frame.extend_from_slice(&mask);
    for (i, &byte) in payload.iter().enumerate() {
        frame.push(byte ^ mask[i % 4]);
    }
    frame
}

// According to the websockets RFC, a payload length up to 125 is written in
// the length byte itself, up to 65535 as marker 126 plus two big-endian
// bytes, and anything larger as marker 127 plus eight big-endian bytes.
fn push_length(frame: &mut Vec<u8>, payload_len: usize, masked: bool) {
    let mask_bit = if masked { MASK_BIT } else { 0 };
    if payload_len <= 125 {
        frame.push(mask_bit | payload_len as u8);
    } else if payload_len <= 65535 {
        frame.push(mask_bit | LEN_U16_MARKER);
        frame.extend_from_slice(&(payload_len as u16).to_be_bytes());
    } else {
        frame.push(mask_bit | LEN_U64_MARKER);
        frame.extend_from_slice(&(payload_len as u64).to_be_bytes());
    }
}

/// Builds a legacy draft frame: `0xFF payload 0x00`.
pub fn encode_hixie(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + 2);
    frame.push(0xff);
    frame.extend_from_slice(payload);
    frame.push(0x00);
    frame
}
