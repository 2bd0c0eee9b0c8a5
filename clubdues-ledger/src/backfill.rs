use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{LedgerResult, PaymentRepository, ReceiptAllocator, RECEIPT_SEQUENCE_KEY};

/// Outcome of one backfill run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RepairReport {
    /// Records inspected by the patch scan.
    pub scanned: usize,
    /// Records that received a fresh receipt number.
    pub updated: usize,
    /// Per-record failures; these never abort the run.
    pub failures: Vec<RepairFailure>,
}

impl RepairReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// One record the patch phase could not repair.
#[derive(Clone, Debug, Serialize)]
pub struct RepairFailure {
    pub payment_id: Uuid,
    pub error: String,
}

/// Repair historical records that lack a well-formed receipt number.
///
/// Runs two strictly ordered phases. The seed phase raises the receipt
/// counter to the highest well-formed number already stored, so later
/// allocations can never collide with historical data. The patch phase then
/// assigns a freshly allocated number to every record whose identifier is
/// missing or malformed, addressing each record by its internal id.
///
/// Both phases are monotone, so the job is idempotent and safe to re-run,
/// to resume after an interruption, and to run alongside live allocation.
pub fn run_legacy_backfill(
    payments: &dyn PaymentRepository,
    allocator: &ReceiptAllocator,
) -> LedgerResult<RepairReport> {
    let max_seen = seed_counter(payments, allocator)?;

    // Patch during the scan itself so the traversal stays cursor-based;
    // each repository call opens its own connection, so the in-flight read
    // snapshot is unaffected by the writes.
    let mut report = RepairReport::default();
    payments.scan(&mut |record| {
        if !record.receipt.needs_repair() {
            return Ok(());
        }
        report.scanned += 1;
        match patch_record(payments, allocator, record.id) {
            Ok(()) => report.updated += 1,
            Err(err) => {
                warn!(payment_id = %record.id, error = %err, "failed to assign receipt number");
                report.failures.push(RepairFailure {
                    payment_id: record.id,
                    error: err.to_string(),
                });
            }
        }
        Ok(())
    })?;

    info!(
        max_seen,
        scanned = report.scanned,
        updated = report.updated,
        failed = report.failed(),
        "legacy receipt backfill finished"
    );
    Ok(report)
}

/// Seed phase: raise the counter to the maximum well-formed receipt value.
/// Never lowers an already-advanced counter.
fn seed_counter(
    payments: &dyn PaymentRepository,
    allocator: &ReceiptAllocator,
) -> LedgerResult<u64> {
    let mut max_seen = 0u64;
    payments.scan(&mut |record| {
        if let Some(number) = record.receipt.number() {
            max_seen = max_seen.max(number.value());
        }
        Ok(())
    })?;
    allocator.raise_floor(RECEIPT_SEQUENCE_KEY, max_seen)?;
    Ok(max_seen)
}

fn patch_record(
    payments: &dyn PaymentRepository,
    allocator: &ReceiptAllocator,
    payment_id: Uuid,
) -> LedgerResult<()> {
    let receipt = allocator.allocate_receipt()?;
    payments.set_receipt(payment_id, receipt)
}
