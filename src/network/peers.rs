use std::collections::HashSet;

use url::Url;

/// The set of known peer endpoints, stored as `host:port` (or the raw
/// registered string when no authority could be parsed out of it).
#[derive(Debug, Default)]
pub struct PeerSet {
    nodes: HashSet<String>,
}

impl PeerSet {
    pub fn from_nodes(nodes: HashSet<String>) -> Self {
        Self { nodes }
    }

    /// Register a peer. Full URLs are reduced to their `host[:port]`
    /// authority; scheme-less input is kept verbatim. Returns whether the
    /// entry was new.
    pub fn register(&mut self, address: &str) -> bool {
        let trimmed = address.trim();
        if trimmed.is_empty() {
            return false;
        }

        if let Ok(url) = Url::parse(trimmed) {
            if let Some(host) = url.host_str() {
                let authority = match url.port() {
                    Some(port) => format!("{}:{}", host, port),
                    None => host.to_string(),
                };
                return self.nodes.insert(authority);
            }
        }
        self.nodes.insert(trimmed.to_string())
    }

    pub fn nodes(&self) -> &HashSet<String> {
        &self.nodes
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.nodes.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_urls_reduce_to_their_authority() {
        let mut peers = PeerSet::default();
        assert!(peers.register("http://localhost:5001"));
        assert!(peers.register("https://node.example.com/chain"));
        assert!(peers.nodes().contains("localhost:5001"));
        assert!(peers.nodes().contains("node.example.com"));
    }

    #[test]
    fn scheme_less_input_is_kept_verbatim() {
        let mut peers = PeerSet::default();
        assert!(peers.register("localhost:5001"));
        assert!(peers.register("example.com"));
        assert!(peers.nodes().contains("localhost:5001"));
        assert!(peers.nodes().contains("example.com"));
    }

    #[test]
    fn registration_is_idempotent() {
        let mut peers = PeerSet::default();
        assert!(peers.register("http://localhost:5001"));
        assert!(!peers.register("http://localhost:5001"));
        assert!(!peers.register("localhost:5001"));
        assert_eq!(peers.len(), 1);
    }

    #[test]
    fn blank_input_is_ignored() {
        let mut peers = PeerSet::default();
        assert!(!peers.register("   "));
        assert!(peers.is_empty());
    }
}
