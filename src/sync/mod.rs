pub mod engine;

pub use engine::{SyncEngine, SyncPhase, SyncSession};
