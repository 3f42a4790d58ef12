//! Wire protocol between the client and the session controller.

pub mod codec;
pub mod events;
pub mod messages;
pub mod types;

pub use codec::{decode, encode, CodecError, DecodeError};
pub use events::*;
pub use messages::*;
pub use types::*;
