use std::fmt;

use serde::{Deserialize, Serialize};

/// Signing material in wallet import format.
///
/// The value is only ever handed to the crafting service. It is redacted from
/// `Debug` output so it cannot leak into logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Wif(String);

impl Wif {
    pub fn new(wif: impl Into<String>) -> Self {
        Self(wif.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Wif {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Wif(<redacted>)")
    }
}

/// The address that funds the session and the key that can spend from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub address: String,
    pub wif: Wif,
}

impl Identity {
    pub fn new(address: impl Into<String>, wif: Wif) -> Self {
        Self {
            address: address.into(),
            wif,
        }
    }
}
