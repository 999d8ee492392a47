use crate::error::{LedgerError, Result};
use std::collections::BTreeSet;
use tracing::debug;

/// Known peers, stored as bare `host[:port]` network locations.
#[derive(Clone, Debug, Default)]
pub struct NodeRegistry {
    nodes: BTreeSet<String>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the network location of `address`. Returns the stored form;
    /// registering the same location twice is a no-op.
    pub fn register_node(&mut self, address: &str) -> Result<String> {
        let location = network_location(address)?;
        if self.nodes.insert(location.clone()) {
            debug!(%location, "registered peer");
        }
        Ok(location)
    }

    /// Peers in sorted order.
    pub fn nodes(&self) -> Vec<String> {
        self.nodes.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Reduce `http://user@Host:5000/path?q` and `host:5000` alike to `host:5000`.
pub fn network_location(address: &str) -> Result<String> {
    let invalid = || LedgerError::InvalidAddress(address.to_string());

    let trimmed = address.trim();
    let rest = match trimmed.find("://") {
        Some(pos) => &trimmed[pos + 3..],
        None => trimmed.strip_prefix("//").unwrap_or(trimmed),
    };
    let authority = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let hostport = match authority.rfind('@') {
        Some(pos) => &authority[pos + 1..],
        None => authority,
    };

    let (host, port) = split_port(hostport).ok_or_else(invalid)?;
    if host.is_empty() || host.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let host = host.to_ascii_lowercase();
    Ok(match port {
        Some(port) => format!("{host}:{port}"),
        None => host,
    })
}

/// Split off a numeric port, leaving bracketed IPv6 literals intact.
fn split_port(hostport: &str) -> Option<(&str, Option<u16>)> {
    let (host, port) = if hostport.starts_with('[') {
        let end = hostport.find(']')?;
        match &hostport[end + 1..] {
            "" => (&hostport[..=end], None),
            tail => (&hostport[..=end], Some(tail.strip_prefix(':')?)),
        }
    } else {
        match hostport.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (hostport, None),
        }
    };
    let port = match port {
        Some(p) => Some(p.parse::<u16>().ok()?),
        None => None,
    };
    Some((host, port))
}
