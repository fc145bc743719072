/// Progress tracking for bulk historical block sync.
///
/// Decides, for every block number below the pivot, whether its body (or
/// receipts) still has to be fetched, is in flight, or is durably stored, and
/// which numbers are safe to hand to the next request batch.
///
/// - **Status**: the five-state per-block lifecycle and its legal transitions
/// - **Status Array**: 3-bit packed, lock-free storage of one status per block
/// - **Sync Status List**: the scheduler feeds call to pull work and report results
/// - **Pipeline**: which status triple a list drives (bodies or receipts)
///
/// ## Flow
///
/// 1. A feed calls `get_infos_for_batch` and receives pending blocks, now marked sent
/// 2. The feed requests them from peers
/// 3. On success it calls `mark_inserted`, on failure `mark_pending`
/// 4. Later scans fold contiguous inserted blocks into the gap-free watermark
///
/// All operations take `&self` and are safe to call from any number of threads.
pub mod config;
pub mod error;
pub mod pipeline;
pub mod providers;
pub mod status;
pub mod status_array;
pub mod status_list;

pub use error::Error;
pub use pipeline::Pipeline;
pub use providers::{BlockTree, ReceiptStorage};
pub use status::FastBlockStatus;
pub use status_array::{SetOutcome, StatusArray};
pub use status_list::{LowestPersisted, StatusListParams, SyncProgress, SyncStatusList};

#[cfg(test)]
mod tests;
