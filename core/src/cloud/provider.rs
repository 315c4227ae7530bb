//! Pluggable external inventory providers.
//!
//! A provider returns the raw host list (name, IP, role tags) from an
//! inventory API. When no provider is configured the engine falls back
//! transparently to the cache file; when a live fetch was explicitly
//! requested, provider failures are fatal and never silently masked by
//! cached data.

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::types::config::ProviderConfig;
use crate::types::node::Node;

/// A fetcher for the raw host list of one stage.
pub trait InventoryProvider {
    fn fetch_nodes(&self) -> Result<Vec<Node>>;
}

/// Wire format of the server-list endpoint.
#[derive(Debug, Deserialize)]
struct ServerListResponse {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    data: Vec<ServerRecord>,
}

#[derive(Debug, Deserialize)]
struct ServerRecord {
    hostname: String,
    ip: String,
    #[serde(default)]
    roles: Vec<String>,
}

/// Provider backed by a REST endpoint serving
/// `GET /api/servers/list?app_token=…`.
pub struct RestProvider {
    cfg: ProviderConfig,
    client: reqwest::blocking::Client,
}

impl RestProvider {
    pub fn new(cfg: ProviderConfig) -> Self {
        RestProvider {
            cfg,
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl InventoryProvider for RestProvider {
    fn fetch_nodes(&self) -> Result<Vec<Node>> {
        let url = format!("{}/api/servers/list", self.cfg.url.trim_end_matches('/'));
        let body = self
            .client
            .get(&url)
            .query(&[("app_token", self.cfg.token.as_str())])
            .send()?
            .text()?;
        parse_server_list(&body)
    }
}

/// Parse a server-list payload into nodes. An explicit failure payload is a
/// fatal provider error carrying the provider's message.
pub fn parse_server_list(body: &str) -> Result<Vec<Node>> {
    let resp: ServerListResponse = serde_json::from_str(body)
        .map_err(|e| Error::Provider(format!("malformed response: {}", e)))?;
    if !resp.success {
        return Err(Error::Provider(
            resp.error.unwrap_or_else(|| "unspecified failure".into()),
        ));
    }
    Ok(resp
        .data
        .into_iter()
        .map(|s| {
            let mut node = Node::new(&s.hostname, &s.ip);
            node.roles = s.roles;
            node
        })
        .collect())
}
