use std::sync::Arc;

use clubdues_core::ReceiptNumber;

use crate::{CounterStore, LedgerError, LedgerResult};

/// Counter key backing the sequential receipt numbers. The name is part of
/// the stored data and must not change.
pub const RECEIPT_SEQUENCE_KEY: &str = "receiptNumber";

/// Mints sequential receipt numbers from a shared counter.
///
/// All counter writes in the system go through this type; nothing else is
/// allowed to touch the sequence values. Every call to [`allocate`]
/// consumes one value even if the caller's subsequent persist fails, so the
/// sequence may have gaps but never duplicates.
///
/// [`allocate`]: ReceiptAllocator::allocate
#[derive(Clone)]
pub struct ReceiptAllocator {
    counters: Arc<dyn CounterStore>,
}

impl ReceiptAllocator {
    pub fn new(counters: Arc<dyn CounterStore>) -> Self {
        Self { counters }
    }

    /// Atomically advance the named sequence and format the new value.
    pub fn allocate(&self, key: &str) -> LedgerResult<ReceiptNumber> {
        if key.trim().is_empty() {
            return Err(LedgerError::InvalidSequenceKey);
        }
        let value = self.counters.increment(key)?;
        Ok(ReceiptNumber::new(value))
    }

    /// Allocate against the canonical receipt sequence.
    pub fn allocate_receipt(&self) -> LedgerResult<ReceiptNumber> {
        self.allocate(RECEIPT_SEQUENCE_KEY)
    }

    /// Raise the named sequence to at least `floor`. Used by the backfill
    /// seed phase; never lowers the counter.
    pub fn raise_floor(&self, key: &str, floor: u64) -> LedgerResult<u64> {
        if key.trim().is_empty() {
            return Err(LedgerError::InvalidSequenceKey);
        }
        self.counters.raise_to(key, floor)
    }
}
