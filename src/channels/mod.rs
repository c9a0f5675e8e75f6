//! Transport abstraction for activity I/O.

pub mod cli;
pub mod memory;
mod transport;

pub use cli::CliTransport;
pub use memory::{MemoryTransport, Outbound};
pub use transport::*;
