use std::str::FromStr;

use bitcoin::{address::NetworkUnchecked, Address};

use crate::{Network, ValidationError};

/// Checks that `address` parses and belongs to `network`.
pub fn validate_address(address: &str, network: Network) -> Result<(), ValidationError> {
    if address.trim().is_empty() {
        return Err(ValidationError::Missing("destination address"));
    }

    let unchecked = Address::<NetworkUnchecked>::from_str(address).map_err(|error| {
        ValidationError::InvalidAddress {
            address: address.to_string(),
            reason: error.to_string(),
        }
    })?;

    if !unchecked.is_valid_for_network(network.bitcoin_network()) {
        return Err(ValidationError::WrongNetwork {
            address: address.to_string(),
            network: network.to_string(),
        });
    }

    Ok(())
}
