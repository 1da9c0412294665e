use dslab_types::Network;

/// Where the live feed for each network is served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEndpoints {
    pub testnet: String,
    pub main: String,
}

impl StreamEndpoints {
    pub fn mempool_space() -> Self {
        Self {
            testnet: "wss://mempool.space/testnet/ws".to_string(),
            main: "wss://mempool.space/ws".to_string(),
        }
    }

    /// Uses the same endpoint regardless of network, e.g. a local simulator.
    pub fn single(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            testnet: url.clone(),
            main: url,
        }
    }

    pub fn url(&self, network: Network) -> &str {
        match network {
            Network::Testnet => &self.testnet,
            Network::Main => &self.main,
        }
    }
}

impl Default for StreamEndpoints {
    fn default() -> Self {
        Self::mempool_space()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_follows_network() {
        let endpoints = StreamEndpoints::default();
        assert_eq!(endpoints.url(Network::Testnet), "wss://mempool.space/testnet/ws");
        assert_eq!(endpoints.url(Network::Main), "wss://mempool.space/ws");
    }
}
