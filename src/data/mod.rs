pub mod series_store;

pub use series_store::{MergeResult, SeriesStore};
