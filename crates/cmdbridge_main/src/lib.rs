mod cli;
mod logging;
mod runner;

pub use cli::{Cli, TopLevelCommand};
pub use logging::init_tracing;
pub use runner::{connect_in_process, execute_once, run, serve, serve_stdio};
