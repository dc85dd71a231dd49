//! Application layer orchestrating domain logic and infrastructure.

pub mod aggregate;
pub mod classify;
pub mod language;
pub mod resolve;
pub mod tree;
