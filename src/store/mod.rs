//! Shared state container: snapshot reads and dispatched updates.

pub mod memory;
pub mod traits;

pub use memory::MemoryStore;
pub use traits::{Action, AppState, BotData, Promptable, Store};
