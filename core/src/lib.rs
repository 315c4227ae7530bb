//! Caravel core — the fleet container reconciliation engine.
//!
//! Keeps the observed set of running containers on a small fleet of hosts
//! aligned with the desired state declared in a configuration document.
//! The pipeline: the collector observes what runs (`docker::collect`), the
//! compiler expands what should run (`convergence::compiler`), the planner
//! diffs the two into a change list (`convergence::planner`), placement
//! picks hosts for new work (`convergence::placement`), and the executor
//! applies the changes through an injected remote runner
//! (`convergence::executor`, `infrastructure`).
//!
//! The engine is single-threaded and synchronous; within one pass the diff
//! runs to completion in memory before any change executes.

pub mod cli;
pub mod cloud;
pub mod convergence;
pub mod docker;
pub mod engine;
pub mod error;
pub mod infrastructure;
pub mod types;

pub use error::{Error, Result};
