//! Hub wire protocol layer for castline.
//!
//! serde models of the Hub HTTP API's JSON messages, the pure decoder
//! that turns them into normalized records, and the `HubClient`
//! collaborator trait. No I/O lives here; concrete clients are provided
//! by `castline-ingest`.

pub mod decode;
pub mod hub;
pub mod wire;

pub use decode::decode;
pub use hub::HubClient;
pub use wire::{Message, MessagesPage};
