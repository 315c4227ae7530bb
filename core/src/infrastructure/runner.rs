//! Production runner that executes commands over SSH.

use std::process::{Command, Stdio};

use log::debug;

use super::RemoteRunner;
use crate::error::{Error, Result};
use crate::types::node::Node;

/// Runs commands on fleet nodes via the system `ssh` binary.
///
/// The target address is the node's internal IP; the login user is the
/// node's own `user` when declared, else the configured default.
pub struct SshRunner {
    default_user: Option<String>,
}

impl SshRunner {
    pub fn new(default_user: Option<String>) -> Self {
        SshRunner { default_user }
    }

    fn target(&self, node: &Node) -> String {
        let user = node
            .user
            .as_deref()
            .or(self.default_user.as_deref());
        match user {
            Some(u) => format!("{}@{}", u, node.internal_ip()),
            None => node.internal_ip().to_string(),
        }
    }
}

impl RemoteRunner for SshRunner {
    fn run(&self, node: &Node, cmd: &str) -> Result<String> {
        debug!("[{}] {}", node.name, cmd);
        let output = Command::new("ssh")
            .arg("-o")
            .arg("BatchMode=yes")
            .arg(self.target(node))
            .arg(cmd)
            .output()
            .map_err(|e| Error::remote(&node.name, format!("cannot spawn ssh: {}", e)))?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(Error::remote(
                &node.name,
                format!("{} ({})", stderr.trim(), output.status),
            ))
        }
    }

    fn test(&self, node: &Node, cmd: &str) -> bool {
        debug!("[{}] test: {}", node.name, cmd);
        Command::new("ssh")
            .arg("-o")
            .arg("BatchMode=yes")
            .arg(self.target(node))
            .arg(cmd)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn upload(&self, node: &Node, content: &str, remote_path: &str) -> Result<()> {
        // Piped through ssh rather than scp so no local temp file is needed.
        use std::io::Write;
        let mut child = Command::new("ssh")
            .arg("-o")
            .arg("BatchMode=yes")
            .arg(self.target(node))
            .arg(format!("cat > {}", remote_path))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::remote(&node.name, format!("cannot spawn ssh: {}", e)))?;
        if let Some(stdin) = child.stdin.as_mut() {
            stdin
                .write_all(content.as_bytes())
                .map_err(|e| Error::remote(&node.name, format!("upload write failed: {}", e)))?;
        }
        let output = child
            .wait_with_output()
            .map_err(|e| Error::remote(&node.name, e.to_string()))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(Error::remote(
                &node.name,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_prefers_node_user_and_internal_ip() {
        let runner = SshRunner::new(Some("admin".into()));
        let mut node = Node::new("h1", "10.0.0.1");
        assert_eq!(runner.target(&node), "admin@10.0.0.1");
        node.user = Some("deploy".into());
        node.internal_ip = Some("192.168.0.1".into());
        assert_eq!(runner.target(&node), "deploy@192.168.0.1");
    }

    #[test]
    fn target_without_any_user() {
        let runner = SshRunner::new(None);
        let node = Node::new("h1", "10.0.0.1");
        assert_eq!(runner.target(&node), "10.0.0.1");
    }
}
