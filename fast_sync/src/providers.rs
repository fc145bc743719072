use containers::{BlockInfo, BlockNumber};

/// Read access to the header chain and body storage.
///
/// Abstracts the block tree so the status lists can be tested with mocks.
pub trait BlockTree: Send + Sync {
    /// Canonical block info for `number`, or `None` if headers have not
    /// reached it yet.
    fn find_canonical_block_info(&self, number: BlockNumber) -> Option<BlockInfo>;

    /// Lowest block whose body is durably stored, or `None` if none is.
    fn lowest_inserted_body_number(&self) -> Option<BlockNumber>;
}

/// Read access to receipt storage progress.
pub trait ReceiptStorage: Send + Sync {
    /// Lowest block whose receipts are durably stored, or `None` if none are.
    fn lowest_inserted_receipt_number(&self) -> Option<BlockNumber>;
}
