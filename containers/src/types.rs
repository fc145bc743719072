use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type BlockNumber = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bytes32(pub B256);

impl From<[u8; 32]> for Bytes32 {
    fn from(bytes: [u8; 32]) -> Self {
        Bytes32(B256::from(bytes))
    }
}

impl fmt::Display for Bytes32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_prefixed_lowercase_hex() {
        let hash = Bytes32::from([0xab; 32]);
        assert_eq!(hash.to_string(), format!("0x{}", "ab".repeat(32)));
    }

    #[test]
    fn default_is_all_zero() {
        assert_eq!(Bytes32::default(), Bytes32::from([0; 32]));
    }
}
