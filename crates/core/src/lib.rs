//! Lectern Core Library
//!
//! This crate provides the foundational utilities shared by every Lectern crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management and engine flags

pub mod config;
pub mod error;
pub mod flags;
pub mod logging;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use flags::EngineFlags;
