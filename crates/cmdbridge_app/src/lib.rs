mod bridge;
mod document_store;
mod host;

pub use bridge::*;
pub use document_store::*;
pub use host::*;
