use bytes::Bytes;
use uuid::Uuid;

use crate::error::Error;
use crate::split::WSWriter;

/// Identifies one client for the lifetime of its connection.
pub type ClientId = Uuid;

/// What the accept and reader tasks report to the hub. Everything funnels
/// through one channel, so the hub observes a total order: a client appears
/// with its write half, speaks, then goes away — cleanly or not.
pub enum Event {
    Connected { id: ClientId, writer: WSWriter },
    Message { id: ClientId, payload: Bytes },
    Disconnected { id: ClientId },
    Failed { id: ClientId, error: Error },
}
