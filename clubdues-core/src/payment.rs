use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::Receipt;

/// Academic year of study, stored on the wire as `"1"`..`"4"`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Year {
    #[default]
    #[serde(rename = "1")]
    First,
    #[serde(rename = "2")]
    Second,
    #[serde(rename = "3")]
    Third,
    #[serde(rename = "4")]
    Fourth,
}

impl Year {
    pub fn as_str(self) -> &'static str {
        match self {
            Year::First => "1",
            Year::Second => "2",
            Year::Third => "3",
            Year::Fourth => "4",
        }
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Year {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" => Ok(Year::First),
            "2" => Ok(Year::Second),
            "3" => Ok(Year::Third),
            "4" => Ok(Year::Fourth),
            other => Err(format!("unknown year of study: {other}")),
        }
    }
}

/// Semester the payment covers.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Semester {
    #[default]
    First,
    Second,
}

impl Semester {
    pub fn as_str(self) -> &'static str {
        match self {
            Semester::First => "First",
            Semester::Second => "Second",
        }
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Semester {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "First" => Ok(Semester::First),
            "Second" => Ok(Semester::Second),
            other => Err(format!("unknown semester: {other}")),
        }
    }
}

/// Canonical stored payment record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub receipt: Receipt,
    pub first_name: String,
    pub last_name: String,
    pub reg_no: String,
    pub course: String,
    pub year: Year,
    pub semester: Semester,
    pub amount: Decimal,
    pub paid_on: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRecord {
    /// Materialize a record from a creation payload. The receipt starts out
    /// missing; the creation path assigns one before insert.
    pub fn from_draft(draft: PaymentDraft) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            receipt: Receipt::Missing,
            first_name: draft.first_name,
            last_name: draft.last_name,
            reg_no: draft.reg_no,
            course: draft.course,
            year: draft.year,
            semester: draft.semester,
            amount: draft.amount,
            paid_on: draft.paid_on,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Payload accepted by the payment-creation and update paths. The receipt is
/// deliberately absent: it is allocated, never supplied by a caller.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentDraft {
    pub first_name: String,
    pub last_name: String,
    pub reg_no: String,
    pub course: String,
    #[serde(default)]
    pub year: Year,
    #[serde(default)]
    pub semester: Semester,
    pub amount: Decimal,
    pub paid_on: DateTime<Utc>,
}
