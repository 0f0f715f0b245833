pub mod config;
pub mod logging;
pub mod mining;

pub use config::Settings;
pub use mining::{mine_directory, MiningSummary};
