//! Shared pieces of the dropgate command-line binaries.

pub mod config;
