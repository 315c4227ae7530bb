//! Container-runtime concerns: command synthesis and runtime introspection.

pub mod collect;
pub mod command;

pub use command::DockerCommandBuilder;
