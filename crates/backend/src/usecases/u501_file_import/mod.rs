pub mod auto_mapping;
pub mod cota;
pub mod delimiter;
pub mod error;
pub mod executor;
pub mod file_parser;
pub mod importers;
pub mod progress_tracker;
pub mod repository;
pub mod templates;
pub mod validation;
pub mod values;

pub use error::{ImportError, ImportResult};
pub use executor::ImportExecutor;
pub use progress_tracker::ProgressTracker;
