//! Protocol module containing the command types and the line codec.

pub mod codec;
pub mod command;

pub use codec::{decode_command, encode_command, ProtocolError};
pub use command::*;
