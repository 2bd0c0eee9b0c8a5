use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use uuid::Uuid;

use clubdues_core::{PaymentDraft, PaymentRecord, Receipt, ReceiptNumber, Semester, Year};

use crate::{LedgerError, LedgerResult, PaymentRepository};

const PAYMENT_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS payments (
    payment_id TEXT PRIMARY KEY,
    receipt_number TEXT UNIQUE,
    legacy_receipt TEXT,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    reg_no TEXT NOT NULL,
    course TEXT NOT NULL,
    year TEXT NOT NULL,
    semester TEXT NOT NULL,
    amount TEXT NOT NULL,
    paid_on TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS payments_idx_created_at
    ON payments(created_at);
"#;

const PAYMENT_COLUMNS: &str = "payment_id, receipt_number, legacy_receipt, first_name, \
     last_name, reg_no, course, year, semester, amount, paid_on, created_at, updated_at";

/// SQLite-backed payment repository used by the live backend.
///
/// Only well-formed receipt numbers go into the unique `receipt_number`
/// column; SQLite treats its NULLs as distinct, so any number of
/// unrepaired rows may coexist. Malformed historical values sit in the
/// non-unique `legacy_receipt` column — duplicates there are expected and
/// must not block ingestion.
#[derive(Clone, Debug)]
pub struct SqlitePaymentRepository {
    path: PathBuf,
}

impl SqlitePaymentRepository {
    pub fn new(path: impl Into<PathBuf>) -> LedgerResult<Self> {
        let repo = Self { path: path.into() };
        let conn = repo.connect()?;
        conn.execute_batch(PAYMENT_SCHEMA)?;
        Ok(repo)
    }

    fn connect(&self) -> LedgerResult<Connection> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL; PRAGMA busy_timeout = 5000;",
        )?;
        Ok(conn)
    }
}

impl PaymentRepository for SqlitePaymentRepository {
    fn insert(&self, record: &PaymentRecord) -> LedgerResult<()> {
        let (receipt_number, legacy_receipt) = receipt_columns(&record.receipt);
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO payments (
                payment_id, receipt_number, legacy_receipt, first_name, last_name, reg_no,
                course, year, semester, amount, paid_on, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                record.id.to_string(),
                receipt_number,
                legacy_receipt,
                record.first_name,
                record.last_name,
                record.reg_no,
                record.course,
                record.year.as_str(),
                record.semester.as_str(),
                record.amount.to_string(),
                record.paid_on.to_rfc3339(),
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339(),
            ],
        )
        .map_err(|err| map_receipt_conflict(err, &record.receipt))?;
        Ok(())
    }

    fn get(&self, id: Uuid) -> LedgerResult<Option<PaymentRecord>> {
        let conn = self.connect()?;
        let values = conn
            .query_row(
                &format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE payment_id = ?1"),
                params![id.to_string()],
                row_values,
            )
            .optional()?;
        values.map(record_from_values).transpose()
    }

    fn list(&self) -> LedgerResult<Vec<PaymentRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments ORDER BY created_at DESC"
        ))?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(record_from_values(row_values(row)?)?);
        }
        Ok(records)
    }

    fn update(&self, id: Uuid, draft: PaymentDraft) -> LedgerResult<PaymentRecord> {
        let conn = self.connect()?;
        let changed = conn.execute(
            "UPDATE payments SET
                first_name = ?1, last_name = ?2, reg_no = ?3, course = ?4,
                year = ?5, semester = ?6, amount = ?7, paid_on = ?8, updated_at = ?9
             WHERE payment_id = ?10",
            params![
                draft.first_name,
                draft.last_name,
                draft.reg_no,
                draft.course,
                draft.year.as_str(),
                draft.semester.as_str(),
                draft.amount.to_string(),
                draft.paid_on.to_rfc3339(),
                Utc::now().to_rfc3339(),
                id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(LedgerError::NotFound(id));
        }
        self.get(id)?.ok_or(LedgerError::NotFound(id))
    }

    fn delete(&self, id: Uuid) -> LedgerResult<()> {
        let conn = self.connect()?;
        let changed = conn.execute(
            "DELETE FROM payments WHERE payment_id = ?1",
            params![id.to_string()],
        )?;
        if changed == 0 {
            return Err(LedgerError::NotFound(id));
        }
        Ok(())
    }

    fn set_receipt(&self, id: Uuid, receipt: ReceiptNumber) -> LedgerResult<()> {
        let conn = self.connect()?;
        let changed = conn
            .execute(
                "UPDATE payments SET receipt_number = ?1, updated_at = ?2 WHERE payment_id = ?3",
                params![
                    receipt.to_string(),
                    Utc::now().to_rfc3339(),
                    id.to_string()
                ],
            )
            .map_err(|err| map_receipt_conflict(err, &Receipt::Sequential(receipt)))?;
        if changed == 0 {
            return Err(LedgerError::NotFound(id));
        }
        Ok(())
    }

    fn scan(
        &self,
        visit: &mut dyn FnMut(PaymentRecord) -> LedgerResult<()>,
    ) -> LedgerResult<()> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!("SELECT {PAYMENT_COLUMNS} FROM payments"))?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            visit(record_from_values(row_values(row)?)?)?;
        }
        Ok(())
    }
}

/// Split a receipt into its storage columns: well-formed numbers go to the
/// unique column, malformed historical text to the non-unique one.
fn receipt_columns(receipt: &Receipt) -> (Option<String>, Option<String>) {
    match receipt {
        Receipt::Sequential(number) => (Some(number.to_string()), None),
        Receipt::Legacy(text) => (None, Some(text.clone())),
        Receipt::Missing => (None, None),
    }
}

fn map_receipt_conflict(err: rusqlite::Error, receipt: &Receipt) -> LedgerError {
    if let rusqlite::Error::SqliteFailure(code, ref message) = err {
        let on_receipt = message
            .as_deref()
            .is_some_and(|m| m.contains("receipt_number"));
        if code.code == rusqlite::ErrorCode::ConstraintViolation && on_receipt {
            return LedgerError::DuplicateReceipt(receipt.as_text().unwrap_or_default());
        }
    }
    err.into()
}

type RowValues = (
    String,
    Option<String>,
    Option<String>,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
);

fn row_values(row: &rusqlite::Row<'_>) -> rusqlite::Result<RowValues> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
        row.get(11)?,
        row.get(12)?,
    ))
}

fn record_from_values(values: RowValues) -> LedgerResult<PaymentRecord> {
    let (
        id,
        receipt_number,
        legacy_receipt,
        first_name,
        last_name,
        reg_no,
        course,
        year,
        semester,
        amount,
        paid_on,
        created_at,
        updated_at,
    ) = values;
    Ok(PaymentRecord {
        id: Uuid::parse_str(&id)
            .map_err(|err| LedgerError::Serialization(format!("invalid payment id {id}: {err}")))?,
        // The assigned number wins; an untouched legacy value stays visible
        // until the backfill repairs the record.
        receipt: match receipt_number.as_deref() {
            Some(text) => Receipt::from_raw(Some(text)),
            None => Receipt::from_raw(legacy_receipt.as_deref()),
        },
        first_name,
        last_name,
        reg_no,
        course,
        year: Year::from_str(&year).map_err(LedgerError::Serialization)?,
        semester: Semester::from_str(&semester).map_err(LedgerError::Serialization)?,
        amount: Decimal::from_str(&amount)
            .map_err(|err| LedgerError::Serialization(format!("invalid amount {amount}: {err}")))?,
        paid_on: parse_timestamp(&paid_on)?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn parse_timestamp(text: &str) -> LedgerResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| LedgerError::Serialization(format!("invalid timestamp {text}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn draft(first: &str) -> PaymentDraft {
        PaymentDraft {
            first_name: first.into(),
            last_name: "Okafor".into(),
            reg_no: "22/BIT/011".into(),
            course: "Information Technology".into(),
            year: Year::Third,
            semester: Semester::Second,
            amount: dec!(25000),
            paid_on: Utc::now(),
        }
    }

    fn repo() -> (tempfile::TempDir, SqlitePaymentRepository) {
        let dir = tempdir().unwrap();
        let repo = SqlitePaymentRepository::new(dir.path().join("dues.db")).unwrap();
        (dir, repo)
    }

    #[test]
    fn sqlite_roundtrip() {
        let (_dir, repo) = repo();
        let mut record = PaymentRecord::from_draft(draft("Daniel"));
        record.receipt = Receipt::Sequential(ReceiptNumber::new(1));
        repo.insert(&record).unwrap();

        let loaded = repo.get(record.id).unwrap().unwrap();
        assert_eq!(loaded.receipt.number(), Some(ReceiptNumber::new(1)));
        assert_eq!(loaded.amount, dec!(25000));
        assert_eq!(loaded.semester, Semester::Second);
    }

    #[test]
    fn duplicate_receipt_is_reported_as_such() {
        let (_dir, repo) = repo();
        let mut first = PaymentRecord::from_draft(draft("Daniel"));
        first.receipt = Receipt::Sequential(ReceiptNumber::new(9));
        repo.insert(&first).unwrap();

        let mut second = PaymentRecord::from_draft(draft("Esther"));
        second.receipt = Receipt::Sequential(ReceiptNumber::new(9));
        let err = repo.insert(&second).unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateReceipt(text) if text == "F-0009"));
    }

    #[test]
    fn duplicate_malformed_receipts_coexist() {
        let (_dir, repo) = repo();
        for first in ["Daniel", "Esther"] {
            let mut record = PaymentRecord::from_draft(draft(first));
            record.receipt = Receipt::Legacy("REC2".into());
            repo.insert(&record).unwrap();
        }

        // The malformed value is not indexed, so both rows survive with it.
        let records = repo.list().unwrap();
        assert_eq!(records.len(), 2);
        assert!(records
            .iter()
            .all(|record| record.receipt == Receipt::Legacy("REC2".into())));
    }

    #[test]
    fn multiple_missing_receipts_coexist() {
        let (_dir, repo) = repo();
        repo.insert(&PaymentRecord::from_draft(draft("Daniel"))).unwrap();
        repo.insert(&PaymentRecord::from_draft(draft("Esther"))).unwrap();
        assert_eq!(repo.list().unwrap().len(), 2);
    }

    #[test]
    fn update_replaces_fields_but_keeps_the_receipt() {
        let (_dir, repo) = repo();
        let mut record = PaymentRecord::from_draft(draft("Daniel"));
        record.receipt = Receipt::Sequential(ReceiptNumber::new(4));
        repo.insert(&record).unwrap();

        let mut changed = draft("Daniel");
        changed.amount = dec!(30000);
        let updated = repo.update(record.id, changed).unwrap();
        assert_eq!(updated.amount, dec!(30000));
        assert_eq!(updated.receipt.number(), Some(ReceiptNumber::new(4)));
    }

    #[test]
    fn missing_records_surface_not_found() {
        let (_dir, repo) = repo();
        let id = Uuid::new_v4();
        assert!(matches!(
            repo.delete(id),
            Err(LedgerError::NotFound(missing)) if missing == id
        ));
        assert!(matches!(
            repo.set_receipt(id, ReceiptNumber::new(1)),
            Err(LedgerError::NotFound(_))
        ));
    }

    #[test]
    fn summary_totals_count_and_amount() {
        let (_dir, repo) = repo();
        let mut a = PaymentRecord::from_draft(draft("Daniel"));
        a.receipt = Receipt::Sequential(ReceiptNumber::new(1));
        let mut b = PaymentRecord::from_draft(draft("Esther"));
        b.receipt = Receipt::Sequential(ReceiptNumber::new(2));
        b.amount = dec!(5000);
        repo.insert(&a).unwrap();
        repo.insert(&b).unwrap();

        let summary = repo.summary().unwrap();
        assert_eq!(summary.total_payments, 2);
        assert_eq!(summary.total_amount, dec!(30000));
    }
}
