use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use clubdues_core::{PaymentDraft, PaymentRecord, ReceiptNumber};

use crate::LedgerResult;

/// Dashboard totals over the whole collection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct PaymentSummary {
    pub total_payments: usize,
    pub total_amount: Decimal,
}

/// Abstraction over durable payment storage engines.
pub trait PaymentRepository: Send + Sync {
    /// Persist a new record. The receipt column carries a unique index;
    /// collisions surface as [`LedgerError::DuplicateReceipt`].
    ///
    /// [`LedgerError::DuplicateReceipt`]: crate::LedgerError::DuplicateReceipt
    fn insert(&self, record: &PaymentRecord) -> LedgerResult<()>;

    fn get(&self, id: Uuid) -> LedgerResult<Option<PaymentRecord>>;

    /// All records, newest first.
    fn list(&self) -> LedgerResult<Vec<PaymentRecord>>;

    /// Replace the mutable fields of one record. The receipt field is
    /// never changed through this path.
    fn update(&self, id: Uuid, draft: PaymentDraft) -> LedgerResult<PaymentRecord>;

    fn delete(&self, id: Uuid) -> LedgerResult<()>;

    /// Assign a receipt number to exactly one record, addressed by its
    /// internal id rather than any legacy field.
    fn set_receipt(&self, id: Uuid, receipt: ReceiptNumber) -> LedgerResult<()>;

    /// Stream every record through the visitor without materializing the
    /// full collection. The backfill scan relies on this staying
    /// cursor-based.
    fn scan(
        &self,
        visit: &mut dyn FnMut(PaymentRecord) -> LedgerResult<()>,
    ) -> LedgerResult<()>;

    /// Count and total over one streaming pass. Amounts are stored as
    /// decimal text, so the sum is computed client-side.
    fn summary(&self) -> LedgerResult<PaymentSummary> {
        let mut summary = PaymentSummary::default();
        self.scan(&mut |record| {
            summary.total_payments += 1;
            summary.total_amount += record.amount;
            Ok(())
        })?;
        Ok(summary)
    }
}
