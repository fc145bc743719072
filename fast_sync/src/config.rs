//! Scheduler tuning constants.

/// Upper bound on pull rounds in `try_get_infos_for_batch`. Each round that
/// finds already-stored blocks frees slots that the next round refills.
pub const MAX_BATCH_ATTEMPTS: usize = 8;
