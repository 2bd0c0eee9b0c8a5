//! Core domain types shared by the clubdues payment backend.

mod legacy;
mod payment;
mod receipt;

pub use legacy::{normalize, RawPayment};
pub use payment::{PaymentDraft, PaymentRecord, Semester, Year};
pub use receipt::{Receipt, ReceiptNumber};
