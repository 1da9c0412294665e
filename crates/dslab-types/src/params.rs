use serde::{Deserialize, Serialize};

use crate::{validate_address, Network, ValidationError};

/// Everything besides the input that determines the two crafted transactions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CraftParams {
    pub dest_a: String,
    pub dest_b: String,
    /// Sat/vB.
    pub fee_rate: u64,
    pub rbf: bool,
}

impl CraftParams {
    pub fn validate(&self, network: Network) -> Result<(), ValidationError> {
        validate_address(&self.dest_a, network)?;
        validate_address(&self.dest_b, network)?;

        if self.fee_rate == 0 {
            return Err(ValidationError::ZeroFeeRate);
        }

        Ok(())
    }
}
