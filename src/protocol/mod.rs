//! Subscriber line protocol

pub mod codec;
pub mod command;

pub use codec::{encode_update, LineReader};
pub use command::{Command, ACK};
