//! Signer construction using alloy

use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};

/// Parse the configured hex private key into a local signer
pub fn load_signer(private_key: &str) -> Result<PrivateKeySigner> {
    private_key
        .trim()
        .parse()
        .context("Failed to parse private key")
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    #[test]
    fn test_signer_address() {
        let signer = load_signer(&format!("  {}\n", KEY)).unwrap();
        assert_eq!(
            format!("{:?}", signer.address()).to_lowercase(),
            "0x70997970c51812dc3a010c7d01b50e0d17dc79c8"
        );
    }

    #[test]
    fn test_rejects_invalid_key() {
        assert!(load_signer("not-a-key").is_err());
        assert!(load_signer("0x1234").is_err());
    }
}
