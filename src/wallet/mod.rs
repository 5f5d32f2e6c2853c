//! Trading wallet loaded from the configured private key

mod signer;

pub use signer::load_signer;
