mod config;
mod error;
mod stats;
mod types;

pub use config::*;
pub use error::*;
pub use stats::*;
pub use types::*;
