//! Test-double runner that records commands and returns preset responses.

use std::cell::RefCell;

use super::RemoteRunner;
use crate::error::{Error, Result};
use crate::types::node::Node;

/// Records every command (tagged with the node name) and pops responses in
/// the order they were configured. When responses run out, commands succeed
/// with empty output.
pub struct MockRunner {
    responses: RefCell<Vec<std::result::Result<String, String>>>,
    commands: RefCell<Vec<String>>,
}

impl MockRunner {
    pub fn new() -> Self {
        MockRunner {
            responses: RefCell::new(Vec::new()),
            commands: RefCell::new(Vec::new()),
        }
    }

    pub fn with_responses(responses: Vec<std::result::Result<String, String>>) -> Self {
        let mut reversed = responses;
        reversed.reverse();
        MockRunner {
            responses: RefCell::new(reversed),
            commands: RefCell::new(Vec::new()),
        }
    }

    /// Every command issued so far, as `"node: command"` lines.
    pub fn executed_commands(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteRunner for MockRunner {
    fn run(&self, node: &Node, cmd: &str) -> Result<String> {
        self.commands
            .borrow_mut()
            .push(format!("{}: {}", node.name, cmd));
        match self.responses.borrow_mut().pop() {
            Some(Ok(out)) => Ok(out),
            Some(Err(msg)) => Err(Error::remote(&node.name, msg)),
            None => Ok(String::new()),
        }
    }

    fn test(&self, node: &Node, cmd: &str) -> bool {
        self.run(node, cmd).is_ok()
    }

    fn upload(&self, node: &Node, _content: &str, remote_path: &str) -> Result<()> {
        self.commands
            .borrow_mut()
            .push(format!("{}: upload {}", node.name, remote_path));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> Node {
        Node::new("h1", "10.0.0.1")
    }

    #[test]
    fn records_commands_with_node_names() {
        let runner = MockRunner::new();
        runner.run(&node(), "docker ps -q").unwrap();
        assert_eq!(runner.executed_commands(), vec!["h1: docker ps -q"]);
    }

    #[test]
    fn replays_responses_in_order() {
        let runner =
            MockRunner::with_responses(vec![Ok("first".into()), Err("boom".into())]);
        assert_eq!(runner.run(&node(), "a").unwrap(), "first");
        let err = runner.run(&node(), "b").unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn defaults_to_empty_success() {
        let runner = MockRunner::new();
        assert_eq!(runner.run(&node(), "anything").unwrap(), "");
        assert!(runner.test(&node(), "anything"));
    }
}
