mod config;
mod constants;
mod data;
mod report;

pub use config::*;
pub use constants::*;
pub use data::*;
pub use report::*;
