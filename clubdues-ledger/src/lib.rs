//! Receipt-number allocation and payment storage for the clubdues backend.

mod allocator;
mod backfill;
mod counter;
mod error;
mod repository;
mod service;
mod sqlite;

pub use allocator::{ReceiptAllocator, RECEIPT_SEQUENCE_KEY};
pub use backfill::{run_legacy_backfill, RepairFailure, RepairReport};
pub use counter::{CounterStore, SqliteCounterStore};
pub use error::{LedgerError, LedgerResult};
pub use repository::{PaymentRepository, PaymentSummary};
pub use service::PaymentService;
pub use sqlite::SqlitePaymentRepository;
