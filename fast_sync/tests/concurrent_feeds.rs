use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use chain::SyncConfig;
use containers::{BlockInfo, BlockNumber, Bytes32};
use fast_sync::{BlockTree, FastBlockStatus, ReceiptStorage, SyncStatusList};
use parking_lot::Mutex;
use rstest::rstest;

struct Chain {
    pivot: BlockNumber,
}

impl BlockTree for Chain {
    fn find_canonical_block_info(&self, number: BlockNumber) -> Option<BlockInfo> {
        (number <= self.pivot).then(|| BlockInfo::new(number, Bytes32::from([number as u8; 32])))
    }

    fn lowest_inserted_body_number(&self) -> Option<BlockNumber> {
        None
    }
}

impl ReceiptStorage for Chain {
    fn lowest_inserted_receipt_number(&self) -> Option<BlockNumber> {
        None
    }
}

/// Drive `list` to completion from `feeds` threads. Every seventh request is
/// abandoned once before it succeeds. Returns every number handed out.
fn drain<T: BlockTree + 'static>(list: &SyncStatusList<T>, feeds: usize, batch_size: usize) -> Vec<BlockNumber> {
    let served = Mutex::new(Vec::new());
    let abandoned = Mutex::new(HashSet::new());
    let rounds = AtomicU64::new(0);

    thread::scope(|scope| {
        for _ in 0..feeds {
            scope.spawn(|| {
                while !list.is_finished() {
                    assert!(rounds.fetch_add(1, Ordering::Relaxed) < 1_000_000, "drain did not converge");

                    let mut slots = vec![None; batch_size];
                    list.get_infos_for_batch(&mut slots);

                    for info in slots.into_iter().flatten() {
                        served.lock().push(info.block_number);
                        let abandon = info.block_number % 7 == 0
                            && abandoned.lock().insert(info.block_number);
                        if abandon {
                            list.mark_pending(info).unwrap();
                        } else {
                            list.mark_inserted(info.block_number).unwrap();
                        }
                    }
                    thread::yield_now();
                }
            });
        }
    });

    served.into_inner()
}

#[rstest]
#[case(0, 0, 1, 1)]
#[case(10, 0, 4, 11)]
#[case(1_000, 900, 8, 16)]
#[case(5_000, 0, 16, 64)]
#[case(4_097, 13, 12, 7)]
fn bodies_drain_concurrently(
    #[case] pivot: BlockNumber,
    #[case] barrier: BlockNumber,
    #[case] feeds: usize,
    #[case] batch_size: usize,
) {
    let config = SyncConfig {
        pivot_number: pivot,
        ancient_bodies_barrier: barrier,
        ..SyncConfig::default()
    };
    let list = SyncStatusList::bodies(&config, Arc::new(Chain { pivot }));

    let mut served = drain(&list, feeds, batch_size);

    let retries = (barrier..=pivot).filter(|n| n % 7 == 0).count();
    assert_eq!(served.len(), (pivot - barrier + 1) as usize + retries);
    served.sort_unstable();
    served.dedup();
    assert_eq!(served, (barrier..=pivot).collect::<Vec<_>>());

    assert_eq!(list.lowest_insert_without_gaps(), barrier);
    assert_eq!(list.queue_size(), 0);
    for number in barrier..=pivot {
        assert_eq!(list.status_of(number), Ok(FastBlockStatus::Inserted));
    }
}

#[test]
fn receipts_drain_concurrently() {
    let pivot = 2_000;
    let config = SyncConfig {
        pivot_number: pivot,
        ancient_receipts_barrier: 500,
        ..SyncConfig::default()
    };
    let chain = Arc::new(Chain { pivot });
    let list = SyncStatusList::receipts(&config, chain.clone(), chain);

    drain(&list, 8, 32);

    assert!(list.is_finished());
    assert_eq!(list.lowest_insert_without_gaps(), 500);
    assert_eq!(list.status_of(500), Ok(FastBlockStatus::ReceiptInserted));
    assert_eq!(list.status_of(499), Ok(FastBlockStatus::Inserted));
}
