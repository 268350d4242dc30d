pub mod types;
pub mod error;
pub mod config;
pub mod data;
pub mod feed;
pub mod render;
pub mod sync;

pub use config::ChartConfig;
pub use error::{ChartError, Result};
pub use types::*;
