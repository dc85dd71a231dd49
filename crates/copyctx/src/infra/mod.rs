//! Infrastructure adapters: configuration, filesystem walking, clipboard.

pub mod clipboard;
pub mod config;
pub mod walk;
