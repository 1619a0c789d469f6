//! Core types for legal-eaze
//!
//! This crate holds the conversation model, the key-value storage adapter
//! that persists it, the session store the views mutate, and the shared
//! configuration and logging setup.

pub mod config;
pub mod error;
pub mod logging;
pub mod session;
pub mod storage;
pub mod utils;

pub use error::{Error, Result};
