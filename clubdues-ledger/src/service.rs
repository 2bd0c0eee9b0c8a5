use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use clubdues_core::{normalize, PaymentDraft, PaymentRecord, RawPayment, Receipt, ReceiptNumber};

use crate::{
    run_legacy_backfill, CounterStore, LedgerError, LedgerResult, PaymentRepository,
    PaymentSummary, ReceiptAllocator, RepairReport,
};

/// Front door for the payment-creation path and maintenance tooling.
///
/// Owns the allocate-then-persist contract: a creation that collides with an
/// existing receipt number is retried with a fresh allocation exactly once,
/// then surfaced as fatal.
#[derive(Clone)]
pub struct PaymentService {
    payments: Arc<dyn PaymentRepository>,
    allocator: ReceiptAllocator,
}

impl PaymentService {
    pub fn new(payments: Arc<dyn PaymentRepository>, counters: Arc<dyn CounterStore>) -> Self {
        Self {
            payments,
            allocator: ReceiptAllocator::new(counters),
        }
    }

    /// Mint a receipt number for an externally managed record.
    pub fn allocate_receipt(&self) -> LedgerResult<ReceiptNumber> {
        self.allocator.allocate_receipt()
    }

    /// Record a new payment under a freshly allocated receipt number.
    pub fn create(&self, draft: PaymentDraft) -> LedgerResult<PaymentRecord> {
        let mut record = PaymentRecord::from_draft(draft);
        record.receipt = Receipt::Sequential(self.allocator.allocate_receipt()?);
        match self.payments.insert(&record) {
            Ok(()) => {
                debug!(payment_id = %record.id, receipt = %record.receipt.as_text().unwrap_or_default(), "payment recorded");
                Ok(record)
            }
            Err(LedgerError::DuplicateReceipt(taken)) => {
                // Raced with a manually assigned or imported number; one
                // fresh allocation, one more attempt.
                warn!(receipt = %taken, "receipt collision on insert, retrying once");
                let retry = self.allocator.allocate_receipt()?;
                record.receipt = Receipt::Sequential(retry);
                match self.payments.insert(&record) {
                    Ok(()) => Ok(record),
                    Err(LedgerError::DuplicateReceipt(_)) => {
                        Err(LedgerError::AllocationConflict(retry.to_string()))
                    }
                    Err(err) => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Ingest raw historical documents, normalizing them at the boundary.
    /// Returns the number of records stored; rejects are logged and skipped.
    pub fn import(&self, raws: Vec<RawPayment>) -> LedgerResult<usize> {
        let mut stored = 0;
        for raw in raws {
            let record = normalize(raw);
            match self.payments.insert(&record) {
                Ok(()) => stored += 1,
                Err(err) => {
                    warn!(payment_id = %record.id, error = %err, "skipping legacy document");
                }
            }
        }
        Ok(stored)
    }

    /// Run the legacy receipt backfill. Safe to invoke repeatedly.
    pub fn repair(&self) -> LedgerResult<RepairReport> {
        run_legacy_backfill(self.payments.as_ref(), &self.allocator)
    }

    pub fn get(&self, id: Uuid) -> LedgerResult<Option<PaymentRecord>> {
        self.payments.get(id)
    }

    pub fn list(&self) -> LedgerResult<Vec<PaymentRecord>> {
        self.payments.list()
    }

    /// Update a payment's details. The receipt number is immutable once
    /// assigned, so drafts cannot carry one.
    pub fn update(&self, id: Uuid, draft: PaymentDraft) -> LedgerResult<PaymentRecord> {
        self.payments.update(id, draft)
    }

    pub fn delete(&self, id: Uuid) -> LedgerResult<()> {
        self.payments.delete(id)
    }

    pub fn summary(&self) -> LedgerResult<PaymentSummary> {
        self.payments.summary()
    }
}
