//! Bit-packed, lock-free array of block statuses.
//!
//! Every status takes `ITEM_BITS` bits and `ITEMS_PER_WORD` of them share one
//! `AtomicU64`. Writes replace a single field with a compare-and-swap over the
//! whole containing word, retrying when a neighbour in the same word changed
//! underneath. No index ever blocks on another.
use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::status::FastBlockStatus;

pub const WORD_BITS: u32 = u64::BITS;
pub const ITEM_BITS: u32 = 3;
pub const ITEMS_PER_WORD: u64 = (WORD_BITS / ITEM_BITS) as u64;
pub const ITEM_MASK: u64 = (1 << ITEM_BITS) - 1;

/// Number of words needed to hold `length` statuses.
pub const fn word_count(length: u64) -> usize {
    length.div_ceil(ITEMS_PER_WORD) as usize
}

/// Word index and bit shift of the field holding `index`.
pub const fn locate(index: u64) -> (usize, u32) {
    let word = (index / ITEMS_PER_WORD) as usize;
    let shift = (index % ITEMS_PER_WORD) as u32 * ITEM_BITS;
    (word, shift)
}

/// Read the field at `shift` out of `word`.
pub fn decode(word: u64, shift: u32) -> FastBlockStatus {
    let bits = ((word >> shift) & ITEM_MASK) as u8;
    match FastBlockStatus::from_bits(bits) {
        Some(status) => status,
        None => unreachable!("status bits {bits:#05b} are never written"),
    }
}

/// Replace the field at `shift` in `word` with `status`.
pub const fn encode(word: u64, shift: u32, status: FastBlockStatus) -> u64 {
    (word & !(ITEM_MASK << shift)) | ((status.bits() as u64) << shift)
}

/// Result of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// This call performed the transition away from `previous`.
    Set { previous: FastBlockStatus },
    /// The transition from `current` is not legal; nothing was written.
    /// `current` equal to the target means a competitor already got there.
    Rejected { current: FastBlockStatus },
}

impl SetOutcome {
    pub fn is_set(&self) -> bool {
        matches!(self, SetOutcome::Set { .. })
    }

    /// The status found in the field when the decision was made.
    pub fn observed(&self) -> FastBlockStatus {
        match *self {
            SetOutcome::Set { previous } => previous,
            SetOutcome::Rejected { current } => current,
        }
    }
}

#[derive(Debug)]
pub struct StatusArray {
    words: Box<[AtomicU64]>,
    length: u64,
}

impl StatusArray {
    /// Array of `length` statuses, all `Pending`.
    pub fn new(length: u64) -> Self {
        Self::filled(length, FastBlockStatus::Pending)
    }

    /// Array of `length` statuses, all set to `status`.
    pub fn filled(length: u64, status: FastBlockStatus) -> Self {
        let pattern = (0..ITEMS_PER_WORD)
            .fold(0u64, |word, slot| encode(word, slot as u32 * ITEM_BITS, status));
        let words = (0..word_count(length))
            .map(|_| AtomicU64::new(pattern))
            .collect();

        Self { words, length }
    }

    /// Array initialised from `statuses`.
    ///
    /// The sequential path assembles each word before publishing it. The
    /// parallel path writes every index independently through the CAS loop,
    /// since indices sharing a word would otherwise clobber each other.
    pub fn from_statuses(statuses: &[FastBlockStatus], parallel: bool) -> Self {
        let length = statuses.len() as u64;

        if parallel {
            let array = Self::new(length);
            statuses
                .par_iter()
                .enumerate()
                .for_each(|(index, &status)| array.store(index as u64, status));
            return array;
        }

        let words = statuses
            .chunks(ITEMS_PER_WORD as usize)
            .map(|chunk| {
                let word = chunk.iter().enumerate().fold(0u64, |word, (slot, &status)| {
                    encode(word, slot as u32 * ITEM_BITS, status)
                });
                AtomicU64::new(word)
            })
            .collect();

        Self { words, length }
    }

    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn get(&self, index: u64) -> Result<FastBlockStatus> {
        let (word, shift) = self.checked_locate(index)?;
        Ok(decode(self.words[word].load(Ordering::Acquire), shift))
    }

    /// Move `index` to `status` if its current value is a legal predecessor.
    pub fn try_set(&self, index: u64, status: FastBlockStatus) -> Result<SetOutcome> {
        self.update(index, status, |current| current.can_transition_to(status))
    }

    /// Number of indices currently holding `status`.
    pub fn count(&self, status: FastBlockStatus) -> u64 {
        (0..self.length)
            .filter(|&index| {
                let (word, shift) = locate(index);
                decode(self.words[word].load(Ordering::Relaxed), shift) == status
            })
            .count() as u64
    }

    /// Unconditional write, still word-CAS so neighbours survive.
    fn store(&self, index: u64, status: FastBlockStatus) {
        let result = self.update(index, status, |_| true);
        debug_assert!(result.is_ok(), "store at {index} outside length {}", self.length);
    }

    fn update(
        &self,
        index: u64,
        status: FastBlockStatus,
        allowed: impl Fn(FastBlockStatus) -> bool,
    ) -> Result<SetOutcome> {
        let (word_index, shift) = self.checked_locate(index)?;
        let word = &self.words[word_index];

        let mut current_word = word.load(Ordering::Acquire);
        loop {
            let current = decode(current_word, shift);
            if !allowed(current) {
                return Ok(SetOutcome::Rejected { current });
            }

            let updated = encode(current_word, shift, status);
            match word.compare_exchange_weak(
                current_word,
                updated,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(SetOutcome::Set { previous: current }),
                Err(actual) => current_word = actual,
            }
        }
    }

    fn checked_locate(&self, index: u64) -> Result<(usize, u32)> {
        if index >= self.length {
            return Err(Error::IndexOutOfRange {
                index,
                length: self.length,
            });
        }
        Ok(locate(index))
    }
}
