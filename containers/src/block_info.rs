use serde::{Deserialize, Serialize};

use crate::types::{BlockNumber, Bytes32};

/// Canonical identity of a block: its number and hash.
///
/// Produced by the block tree from already-synced headers and handed back to
/// the feeds that request the matching body or receipts from peers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockInfo {
    pub block_number: BlockNumber,
    pub block_hash: Bytes32,
}

impl BlockInfo {
    pub fn new(block_number: BlockNumber, block_hash: Bytes32) -> Self {
        Self {
            block_number,
            block_hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn serde_uses_field_names() {
        let info = BlockInfo::new(7, Bytes32::from([0xab; 32]));
        let json = serde_json::to_value(info).unwrap();

        assert_eq!(json["block_number"], 7);
        assert_eq!(json["block_hash"], format!("0x{}", "ab".repeat(32)));

        let back: BlockInfo = serde_json::from_value(json).unwrap();
        assert_eq!(back, info);
    }
}
