mod error;
mod execution;
mod message;
mod ports;
mod request_id;

pub use error::*;
pub use execution::*;
pub use message::*;
pub use ports::*;
pub use request_id::*;
