//! Shared configuration for the codix binary and indexing driver.

pub mod config;

pub use config::Config;
