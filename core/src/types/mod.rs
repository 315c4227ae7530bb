//! Core entity and configuration types.

pub mod config;
pub mod container;
pub mod node;
