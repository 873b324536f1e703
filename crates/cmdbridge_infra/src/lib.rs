mod json_line;
mod memory;
mod shell;

pub use json_line::*;
pub use memory::*;
pub use shell::*;
