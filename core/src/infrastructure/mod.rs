//! Remote-execution backends.
//!
//! `RemoteRunner` is the injected capability the engine uses to act on
//! hosts. `SshRunner` is the production implementation that shells out to
//! `ssh`. `MockRunner` is the test double that records commands and
//! replays preset responses. The core never constructs transport details
//! beyond building these command lines; host selection by role happens in
//! callers via the inventory.

pub mod mock;
pub mod runner;

pub use mock::MockRunner;
pub use runner::SshRunner;

use crate::error::Result;
use crate::types::node::Node;

/// Injected remote-execution capability.
pub trait RemoteRunner {
    /// Run a command on a node and return its combined output.
    fn run(&self, node: &Node, cmd: &str) -> Result<String>;

    /// Whether a command exits successfully on a node.
    fn test(&self, node: &Node, cmd: &str) -> bool;

    /// Upload content to a path on a node.
    fn upload(&self, node: &Node, content: &str, remote_path: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_implements_remote_runner() {
        let runner = MockRunner::new();
        let _: &dyn RemoteRunner = &runner;
    }
}
