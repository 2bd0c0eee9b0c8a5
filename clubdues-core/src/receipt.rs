use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Sequential receipt identifier printed as `F-` plus the zero-padded value.
///
/// The textual form is the one contract existing stored data depends on:
/// values below 10000 render with four digits (`1` → `F-0001`) and larger
/// values render in full (`12345` → `F-12345`).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ReceiptNumber(u64);

impl ReceiptNumber {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ReceiptNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F-{:04}", self.0)
    }
}

impl FromStr for ReceiptNumber {
    type Err = String;

    /// Accepts exactly the well-formed shape `F-` followed by decimal digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("F-")
            .ok_or_else(|| format!("receipt number missing F- prefix: {s}"))?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("receipt number has a non-numeric suffix: {s}"));
        }
        let value: u64 = digits
            .parse()
            .map_err(|err| format!("receipt number out of range {s}: {err}"))?;
        Ok(Self(value))
    }
}

impl From<ReceiptNumber> for String {
    fn from(value: ReceiptNumber) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for ReceiptNumber {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// State of the receipt field on a stored payment record.
///
/// Historical data arrives with the identifier missing, null, or in one of
/// several deprecated formats; those records are the ones the backfill job
/// repairs.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Receipt {
    Sequential(ReceiptNumber),
    Legacy(String),
    Missing,
}

impl Receipt {
    /// Classify a raw stored value. `None` and empty strings count as missing.
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw {
            None => Receipt::Missing,
            Some(text) if text.trim().is_empty() => Receipt::Missing,
            Some(text) => match text.parse::<ReceiptNumber>() {
                Ok(number) => Receipt::Sequential(number),
                Err(_) => Receipt::Legacy(text.to_string()),
            },
        }
    }

    /// The numeric value, when the stored identifier is well formed.
    pub fn number(&self) -> Option<ReceiptNumber> {
        match self {
            Receipt::Sequential(number) => Some(*number),
            _ => None,
        }
    }

    /// Whether the backfill job must assign a fresh identifier.
    pub fn needs_repair(&self) -> bool {
        !matches!(self, Receipt::Sequential(_))
    }

    /// Stored textual form, if any.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Receipt::Sequential(number) => Some(number.to_string()),
            Receipt::Legacy(text) => Some(text.clone()),
            Receipt::Missing => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_four_digit_padding() {
        assert_eq!(ReceiptNumber::new(1).to_string(), "F-0001");
        assert_eq!(ReceiptNumber::new(42).to_string(), "F-0042");
        assert_eq!(ReceiptNumber::new(9999).to_string(), "F-9999");
    }

    #[test]
    fn padding_never_truncates_large_values() {
        assert_eq!(ReceiptNumber::new(10000).to_string(), "F-10000");
        assert_eq!(ReceiptNumber::new(12345).to_string(), "F-12345");
    }

    #[test]
    fn format_round_trips() {
        for n in [1u64, 7, 999, 10000, 123456] {
            let text = ReceiptNumber::new(n).to_string();
            assert_eq!(text.parse::<ReceiptNumber>().unwrap().value(), n);
        }
    }

    #[test]
    fn rejects_malformed_shapes() {
        for bad in ["REC2", "F-", "F-12a", "f-0001", " F-0001", "0001"] {
            assert!(bad.parse::<ReceiptNumber>().is_err(), "accepted {bad}");
        }
    }

    #[test]
    fn classifies_raw_values() {
        assert_eq!(
            Receipt::from_raw(Some("F-0003")),
            Receipt::Sequential(ReceiptNumber::new(3))
        );
        assert_eq!(
            Receipt::from_raw(Some("REC2")),
            Receipt::Legacy("REC2".into())
        );
        assert_eq!(Receipt::from_raw(Some("  ")), Receipt::Missing);
        assert_eq!(Receipt::from_raw(None), Receipt::Missing);
    }

    #[test]
    fn repair_flag_tracks_well_formedness() {
        assert!(!Receipt::from_raw(Some("F-0100")).needs_repair());
        assert!(Receipt::from_raw(Some("receipt-9")).needs_repair());
        assert!(Receipt::Missing.needs_repair());
    }
}
