use alloy_primitives::keccak256;
use containers::{BlockInfo, BlockNumber, Bytes32};
use fast_sync::{BlockTree, ReceiptStorage};

/// In-memory stand-in for the header chain and storage layers.
///
/// Every block up to the pivot has a canonical header. Block hashes are
/// derived from the number so they are stable across runs.
#[derive(Debug, Clone)]
pub struct SimulatedChain {
    pub pivot_number: BlockNumber,
    pub lowest_body: Option<BlockNumber>,
    pub lowest_receipt: Option<BlockNumber>,
    /// Every n-th block carries no transactions, so its receipts need no request.
    pub empty_block_interval: u64,
}

impl SimulatedChain {
    pub fn block_hash(number: BlockNumber) -> Bytes32 {
        Bytes32(keccak256(number.to_be_bytes()))
    }

    pub fn has_no_transactions(&self, info: &BlockInfo) -> bool {
        self.empty_block_interval != 0 && info.block_number % self.empty_block_interval == 0
    }
}

impl BlockTree for SimulatedChain {
    fn find_canonical_block_info(&self, number: BlockNumber) -> Option<BlockInfo> {
        (number <= self.pivot_number).then(|| BlockInfo::new(number, Self::block_hash(number)))
    }

    fn lowest_inserted_body_number(&self) -> Option<BlockNumber> {
        self.lowest_body
    }
}

impl ReceiptStorage for SimulatedChain {
    fn lowest_inserted_receipt_number(&self) -> Option<BlockNumber> {
        self.lowest_receipt
    }
}
