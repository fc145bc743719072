use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use containers::{BlockInfo, BlockNumber, Bytes32};

use crate::providers::{BlockTree, ReceiptStorage};
use crate::status_list::{StatusListParams, SyncStatusList};
use crate::Pipeline;

pub fn block_info(number: BlockNumber) -> BlockInfo {
    let mut hash = [0u8; 32];
    hash[24..].copy_from_slice(&number.to_be_bytes());
    BlockInfo::new(number, Bytes32::from(hash))
}

// Mock block tree for testing
#[derive(Default)]
pub struct MockBlockTree {
    /// Headers known from this number upward; everything below is unresolved.
    pub headers_from: BlockNumber,
    pub lowest_body: Option<BlockNumber>,
    pub lookups: AtomicUsize,
}

impl MockBlockTree {
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl BlockTree for MockBlockTree {
    fn find_canonical_block_info(&self, number: BlockNumber) -> Option<BlockInfo> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        (number >= self.headers_from).then(|| block_info(number))
    }

    fn lowest_inserted_body_number(&self) -> Option<BlockNumber> {
        self.lowest_body
    }
}

pub struct MockReceiptStorage {
    pub lowest_receipt: Option<BlockNumber>,
}

impl ReceiptStorage for MockReceiptStorage {
    fn lowest_inserted_receipt_number(&self) -> Option<BlockNumber> {
        self.lowest_receipt
    }
}

pub fn bodies_list(
    pivot: BlockNumber,
    lower_bound: BlockNumber,
    lowest_persisted: Option<BlockNumber>,
) -> (SyncStatusList<MockBlockTree>, Arc<MockBlockTree>) {
    let tree = Arc::new(MockBlockTree::default());
    let params = StatusListParams {
        pivot_number: pivot,
        lower_bound,
        lowest_persisted: Arc::new(move || lowest_persisted),
        cache_capacity: 64,
    };
    (SyncStatusList::new(Pipeline::Bodies, params, tree.clone()), tree)
}

pub fn numbers(slots: &[Option<BlockInfo>]) -> Vec<BlockNumber> {
    slots.iter().flatten().map(|info| info.block_number).collect()
}
