use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The network every remote call and stream subscription is scoped to.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Testnet,
    Main,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown network {0:?}, expected \"testnet\" or \"main\"")]
pub struct ParseNetworkError(String);

impl Network {
    /// The value sent in the `net` query parameter and request bodies.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Testnet => "testnet",
            Self::Main => "main",
        }
    }

    pub fn is_main(self) -> bool {
        matches!(self, Self::Main)
    }

    pub fn bitcoin_network(self) -> bitcoin::Network {
        match self {
            Self::Testnet => bitcoin::Network::Testnet,
            Self::Main => bitcoin::Network::Bitcoin,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = ParseNetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "testnet" | "test" => Ok(Self::Testnet),
            "main" | "mainnet" | "bitcoin" => Ok(Self::Main),
            _ => Err(ParseNetworkError(s.to_string())),
        }
    }
}
