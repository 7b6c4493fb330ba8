mod error;
mod message;
mod outbox;
mod session;
mod session_registry;

pub use error::*;
pub use message::*;
pub use outbox::*;
pub use session::*;
pub use session_registry::*;

pub extern crate serde;
pub extern crate serde_json;
