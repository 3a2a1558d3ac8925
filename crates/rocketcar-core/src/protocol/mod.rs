//! Protocol module containing the event types and the JSON codec.

pub mod codec;
pub mod messages;

pub use codec::{decode_client_event, encode_server_event, ProtocolError};
pub use messages::*;
