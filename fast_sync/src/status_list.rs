//! Scheduler for one sync pipeline.
//!
//! Hands out pending block numbers from the gap-free watermark downward,
//! records completions, and folds contiguous completions into the watermark
//! as later scans walk past them.
//!
//! ## Watermark
//!
//! `lowest_insert_without_gaps` only moves down, one index at a time, and only
//! when a scan finds the index it currently points at already inserted. The
//! decrement is a compare-and-swap against that exact value, so concurrent
//! scans that discover the same boundary advance it once. Completions far
//! below the watermark are not folded until a scan reaches them.
//!
//! The watermark never drops below `lower_bound`. The floor index itself is
//! folded through a separate once-only flag.
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use chain::SyncConfig;
use containers::{BlockInfo, BlockNumber};
use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::config::MAX_BATCH_ATTEMPTS;
use crate::error::Result;
use crate::pipeline::Pipeline;
use crate::providers::{BlockTree, ReceiptStorage};
use crate::status::FastBlockStatus;
use crate::status_array::{SetOutcome, StatusArray};

/// Source of the lowest durably stored block number, re-read on every reset.
pub type LowestPersisted = Arc<dyn Fn() -> Option<BlockNumber> + Send + Sync>;

#[derive(Clone)]
pub struct StatusListParams {
    pub pivot_number: BlockNumber,
    pub lower_bound: BlockNumber,
    pub lowest_persisted: LowestPersisted,
    pub cache_capacity: usize,
}

impl std::fmt::Debug for StatusListParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusListParams")
            .field("pivot_number", &self.pivot_number)
            .field("lower_bound", &self.lower_bound)
            .field("cache_capacity", &self.cache_capacity)
            .finish_non_exhaustive()
    }
}

/// Point-in-time view of a list, for progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncProgress {
    pub pipeline: Pipeline,
    pub pivot_number: BlockNumber,
    pub lower_bound: BlockNumber,
    pub lowest_insert_without_gaps: BlockNumber,
    pub queue_size: u64,
    pub finished: bool,
}

pub struct SyncStatusList<T: BlockTree> {
    pipeline: Pipeline,
    params: StatusListParams,
    block_tree: Arc<T>,
    statuses: StatusArray,
    /// Infos of abandoned requests, so re-sending them skips the block tree.
    cache: Mutex<LruCache<BlockNumber, BlockInfo>>,
    lowest_insert_without_gaps: AtomicU64,
    floor_folded: AtomicBool,
    /// Signed because a scan may fold an index before the inserting thread
    /// has bumped the counter.
    queue_size: AtomicI64,
}

impl<T: BlockTree + 'static> SyncStatusList<T> {
    pub fn new(pipeline: Pipeline, params: StatusListParams, block_tree: Arc<T>) -> Self {
        let capacity = NonZeroUsize::new(params.cache_capacity).unwrap_or(NonZeroUsize::MIN);

        let mut list = Self {
            pipeline,
            params,
            block_tree,
            statuses: StatusArray::new(0),
            cache: Mutex::new(LruCache::new(capacity)),
            lowest_insert_without_gaps: AtomicU64::new(0),
            floor_folded: AtomicBool::new(false),
            queue_size: AtomicI64::new(0),
        };
        list.reset();
        list
    }

    /// Bodies list: resumes from the lowest stored body.
    pub fn bodies(config: &SyncConfig, block_tree: Arc<T>) -> Self {
        let tree = Arc::clone(&block_tree);
        let params = StatusListParams {
            pivot_number: config.pivot_number,
            lower_bound: config.ancient_bodies_barrier_calc(),
            lowest_persisted: Arc::new(move || tree.lowest_inserted_body_number()),
            cache_capacity: config.block_info_cache_capacity,
        };
        Self::new(Pipeline::Bodies, params, block_tree)
    }

    /// Receipts list: resumes from the lowest stored receipt.
    pub fn receipts<R>(config: &SyncConfig, block_tree: Arc<T>, receipt_storage: Arc<R>) -> Self
    where
        R: ReceiptStorage + 'static,
    {
        let params = StatusListParams {
            pivot_number: config.pivot_number,
            lower_bound: config.ancient_receipts_barrier_calc(),
            lowest_persisted: Arc::new(move || receipt_storage.lowest_inserted_receipt_number()),
            cache_capacity: config.block_info_cache_capacity,
        };
        Self::new(Pipeline::Receipts, params, block_tree)
    }

    /// Re-initialise from persisted progress.
    ///
    /// Takes `&mut self`: no scan or mark may run concurrently with a reset.
    pub fn reset(&mut self) {
        let pivot = self.params.pivot_number;
        let lowest = match (self.params.lowest_persisted)() {
            Some(lowest) if lowest > pivot => {
                warn!(
                    pipeline = %self.pipeline,
                    lowest,
                    pivot,
                    "Persisted progress above pivot, starting at pivot"
                );
                pivot
            }
            Some(lowest) => lowest,
            None => pivot,
        };

        self.statuses = StatusArray::filled(pivot.saturating_add(1), self.pipeline.pending());
        self.cache.get_mut().clear();
        *self.lowest_insert_without_gaps.get_mut() = lowest;
        *self.floor_folded.get_mut() = false;
        *self.queue_size.get_mut() = 0;

        info!(
            pipeline = %self.pipeline,
            pivot,
            lowest_insert_without_gaps = lowest,
            lower_bound = self.params.lower_bound,
            "Sync status list reset"
        );
    }

    pub fn pipeline(&self) -> Pipeline {
        self.pipeline
    }

    pub fn pivot_number(&self) -> BlockNumber {
        self.params.pivot_number
    }

    pub fn lower_bound(&self) -> BlockNumber {
        self.params.lower_bound
    }

    pub fn lowest_insert_without_gaps(&self) -> BlockNumber {
        self.lowest_insert_without_gaps.load(Ordering::Acquire)
    }

    /// Blocks inserted but not yet folded into the watermark.
    pub fn queue_size(&self) -> u64 {
        self.queue_size.load(Ordering::Acquire).max(0) as u64
    }

    pub fn status_of(&self, number: BlockNumber) -> Result<FastBlockStatus> {
        self.statuses.get(number)
    }

    /// Every block from the pivot down to the floor is inserted and folded.
    pub fn is_finished(&self) -> bool {
        let lowest = self.lowest_insert_without_gaps();
        let lower_bound = self.params.lower_bound;
        lowest < lower_bound
            || (lowest == lower_bound && self.floor_folded.load(Ordering::Acquire))
    }

    pub fn progress(&self) -> SyncProgress {
        SyncProgress {
            pipeline: self.pipeline,
            pivot_number: self.params.pivot_number,
            lower_bound: self.params.lower_bound,
            lowest_insert_without_gaps: self.lowest_insert_without_gaps(),
            queue_size: self.queue_size(),
            finished: self.is_finished(),
        }
    }

    /// Fill the empty slots of `slots` with pending blocks, marking them sent.
    ///
    /// Scans from the watermark down to `lower_bound` inclusive. Slots already
    /// holding an info are left alone but count toward the batch. A slot stays
    /// `None` when the block tree cannot resolve its number yet; that number
    /// goes back to pending.
    pub fn get_infos_for_batch(&self, slots: &mut [Option<BlockInfo>]) {
        let sent = self.pipeline.sent();
        let inserted = self.pipeline.inserted();
        let lower_bound = self.params.lower_bound;

        let mut collected = 0;
        let mut served = 0;
        let mut number = self.lowest_insert_without_gaps();

        while collected < slots.len() && number >= lower_bound {
            if slots[collected].is_some() {
                collected += 1;
                continue;
            }

            let outcome = match self.statuses.try_set(number, sent) {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(pipeline = %self.pipeline, %err, "Scan left the tracked range");
                    break;
                }
            };

            match outcome {
                SetOutcome::Set { .. } => {
                    slots[collected] = self.resolve(number);
                    if slots[collected].is_some() {
                        served += 1;
                    }
                    collected += 1;
                }
                SetOutcome::Rejected { current } if current == inserted => self.fold(number),
                SetOutcome::Rejected { .. } => {}
            }

            if number == 0 {
                break;
            }
            number -= 1;
        }

        debug!(
            pipeline = %self.pipeline,
            served,
            slots = slots.len(),
            lowest_insert_without_gaps = self.lowest_insert_without_gaps(),
            queue_size = self.queue_size(),
            "Collected batch"
        );
    }

    /// Pull up to `batch_size` blocks that still need fetching.
    ///
    /// Blocks for which `already_stored` holds are marked inserted on the spot
    /// instead of being returned, and the freed room is refilled, up to
    /// `MAX_BATCH_ATTEMPTS` rounds.
    pub fn try_get_infos_for_batch(
        &self,
        batch_size: usize,
        already_stored: impl Fn(&BlockInfo) -> bool,
    ) -> Result<Vec<BlockInfo>> {
        let mut batch = Vec::with_capacity(batch_size);

        for _ in 0..MAX_BATCH_ATTEMPTS {
            let mut slots = vec![None; batch_size - batch.len()];
            self.get_infos_for_batch(&mut slots);

            let mut pulled_any = false;
            let mut skipped_any = false;
            for info in slots.into_iter().flatten() {
                pulled_any = true;
                if already_stored(&info) {
                    self.mark_inserted(info.block_number)?;
                    skipped_any = true;
                } else {
                    batch.push(info);
                }
            }

            if !pulled_any || !skipped_any || batch.len() >= batch_size {
                break;
            }
        }

        Ok(batch)
    }

    /// Return an abandoned request to the pending pool.
    pub fn mark_pending(&self, info: BlockInfo) -> Result<()> {
        let number = info.block_number;
        self.statuses.get(number)?;

        // Cached before the status flips so a scan that picks it up finds it.
        self.cache.lock().put(number, info);
        match self.statuses.try_set(number, self.pipeline.pending())? {
            SetOutcome::Set { .. } => {
                trace!(pipeline = %self.pipeline, number, "Returned block to pending");
            }
            SetOutcome::Rejected { current } => {
                self.cache.lock().pop(&number);
                debug!(
                    pipeline = %self.pipeline,
                    number,
                    ?current,
                    "Ignored abandon of block not in flight"
                );
            }
        }
        Ok(())
    }

    /// Record that `number` is durably stored.
    pub fn mark_inserted(&self, number: BlockNumber) -> Result<()> {
        match self.statuses.try_set(number, self.pipeline.inserted())? {
            SetOutcome::Set { .. } => {
                self.queue_size.fetch_add(1, Ordering::AcqRel);
            }
            SetOutcome::Rejected { current } => {
                trace!(pipeline = %self.pipeline, number, ?current, "Ignored insert");
            }
        }
        Ok(())
    }

    fn resolve(&self, number: BlockNumber) -> Option<BlockInfo> {
        if let Some(info) = self.cache.lock().pop(&number) {
            return Some(info);
        }

        let info = self.block_tree.find_canonical_block_info(number);
        if info.is_none() {
            // Not resolvable yet. Hand it back so a later batch retries.
            match self.statuses.try_set(number, self.pipeline.pending()) {
                Ok(_) => debug!(pipeline = %self.pipeline, number, "No canonical block info yet"),
                Err(err) => warn!(pipeline = %self.pipeline, %err, "Could not return unresolved block"),
            }
        }
        info
    }

    #[cfg(test)]
    pub(crate) fn cached_infos(&self) -> usize {
        self.cache.lock().len()
    }

    fn fold(&self, number: BlockNumber) {
        let lower_bound = self.params.lower_bound;

        if number > lower_bound {
            if self
                .lowest_insert_without_gaps
                .compare_exchange(number, number - 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                self.queue_size.fetch_sub(1, Ordering::AcqRel);
            }
            return;
        }

        if number == lower_bound
            && self.lowest_insert_without_gaps() == number
            && self
                .floor_folded
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        {
            self.queue_size.fetch_sub(1, Ordering::AcqRel);
            info!(pipeline = %self.pipeline, lower_bound, "Reached ancient barrier");
        }
    }
}
