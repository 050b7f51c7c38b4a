//! Wire protocol: packet layout and per-stream sequencing

pub mod packet;
pub mod sequencer;

pub use packet::{MessageType, Packet, HEADER_LEN, SIGNATURE};
pub use sequencer::Sequencer;
