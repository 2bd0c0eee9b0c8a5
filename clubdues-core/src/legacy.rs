use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::{PaymentRecord, Receipt, Semester, Year};

/// Loosely shaped historical payment document.
///
/// The legacy collection accumulated several spellings of the same concept
/// over time; the serde aliases here enumerate every one of them so the
/// fallbacks live in exactly one place.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPayment {
    #[serde(
        default,
        alias = "receiptNo",
        alias = "receipt",
        alias = "receipt_number"
    )]
    pub receipt_number: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub student_name: Option<String>,
    #[serde(default)]
    pub reg_no: Option<String>,
    #[serde(default)]
    pub course: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub semester_type: Option<String>,
    #[serde(default, alias = "payment")]
    pub payment_amount: Option<Decimal>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

/// Map a raw historical document onto the canonical record shape.
///
/// This is a pure function: malformed receipt values are carried through as
/// [`Receipt::Legacy`] for the backfill job to repair, and absent fields take
/// the same defaults the historical schema used (year 1, first semester,
/// zero amount).
pub fn normalize(raw: RawPayment) -> PaymentRecord {
    let (first_name, last_name) = split_name(&raw);
    let now = Utc::now();
    PaymentRecord {
        id: Uuid::new_v4(),
        receipt: Receipt::from_raw(raw.receipt_number.as_deref()),
        first_name,
        last_name,
        reg_no: raw.reg_no.unwrap_or_default(),
        course: raw.course.unwrap_or_default(),
        year: raw
            .year
            .as_deref()
            .and_then(|value| value.parse::<Year>().ok())
            .unwrap_or_default(),
        semester: raw
            .semester_type
            .as_deref()
            .and_then(|value| value.parse::<Semester>().ok())
            .unwrap_or_default(),
        amount: raw.payment_amount.unwrap_or_default(),
        paid_on: raw.date.unwrap_or(now),
        created_at: now,
        updated_at: now,
    }
}

/// Prefer the split first/last fields; fall back to the combined
/// `studentName` the oldest documents carried.
fn split_name(raw: &RawPayment) -> (String, String) {
    if raw.first_name.is_some() || raw.last_name.is_some() {
        return (
            raw.first_name.clone().unwrap_or_default(),
            raw.last_name.clone().unwrap_or_default(),
        );
    }
    match raw.student_name.as_deref() {
        Some(full) => {
            let mut parts = full.split_whitespace();
            let first = parts.next().unwrap_or_default().to_string();
            let last = parts.collect::<Vec<_>>().join(" ");
            (first, last)
        }
        None => (String::new(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReceiptNumber;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawPayment {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn accepts_every_historical_receipt_field_name() {
        for field in ["receiptNumber", "receiptNo", "receipt", "receipt_number"] {
            let doc = format!(r#"{{ "{field}": "F-0005" }}"#);
            let record = normalize(serde_json::from_str::<RawPayment>(&doc).unwrap());
            assert_eq!(
                record.receipt.number(),
                Some(ReceiptNumber::new(5)),
                "field {field}"
            );
        }
    }

    #[test]
    fn malformed_receipt_survives_as_legacy() {
        let record = normalize(raw(json!({ "receiptNo": "REC2" })));
        assert_eq!(record.receipt, Receipt::Legacy("REC2".into()));
        assert!(record.receipt.needs_repair());
    }

    #[test]
    fn combined_student_name_splits_on_first_space() {
        let record = normalize(raw(json!({ "studentName": "Moses Okello Otim" })));
        assert_eq!(record.first_name, "Moses");
        assert_eq!(record.last_name, "Okello Otim");
    }

    #[test]
    fn split_names_win_over_student_name() {
        let record = normalize(raw(json!({
            "firstName": "Amina",
            "lastName": "Kasule",
            "studentName": "Someone Else"
        })));
        assert_eq!(record.first_name, "Amina");
        assert_eq!(record.last_name, "Kasule");
    }

    #[test]
    fn legacy_payment_field_maps_to_amount() {
        let record = normalize(raw(json!({ "payment": 15000 })));
        assert_eq!(record.amount, dec!(15000));
        let record = normalize(raw(json!({ "paymentAmount": 20000 })));
        assert_eq!(record.amount, dec!(20000));
    }

    #[test]
    fn missing_fields_take_schema_defaults() {
        let record = normalize(raw(json!({})));
        assert_eq!(record.year, Year::First);
        assert_eq!(record.semester, Semester::First);
        assert_eq!(record.amount, Decimal::ZERO);
        assert_eq!(record.receipt, Receipt::Missing);
    }
}
