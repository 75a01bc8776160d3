pub mod config;
pub mod output;
pub mod types;
