//! Building payslip records from loosely typed, named fields.
//!
//! Both the single-record flow and each roster row arrive as a [`FieldMap`]. Amount parsing is
//! tolerant: a value that is missing or not a number becomes zero and is reported as a
//! [`FieldIssue`] instead of failing the row. Any totals present in the source are ignored because
//! [`PayslipRecord`] always derives them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use log::warn;
use rust_decimal::Decimal;

use crate::model::{AmountOverflow, Deductions, Earnings, PayslipRecord, PeriodFields};

pub const EMPLOYEE_NAME: &str = "employee_name";
pub const EMPLOYEE_ID: &str = "employee_id";
pub const BASIC_PAY: &str = "basic_pay";
pub const HOUSING: &str = "housing";
pub const TRANSPORT: &str = "transport";
pub const OTHER_ALLOWANCES: &str = "other_allowances";
pub const TAX: &str = "tax";
pub const EMPLOYEE_PENSION: &str = "employee_pension";
pub const OTHER_DEDUCTIONS: &str = "other_deductions";
pub const EMAIL: &str = "email";

/// Amount columns, in the order they appear on the payslip.
pub const AMOUNT_FIELDS: [&str; 7] = [
    BASIC_PAY,
    HOUSING,
    TRANSPORT,
    OTHER_ALLOWANCES,
    TAX,
    EMPLOYEE_PENSION,
    OTHER_DEDUCTIONS,
];

/// Named string fields with case-insensitive, whitespace-trimmed keys.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldMap {
    values: BTreeMap<String, String>,
}

impl FieldMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value; later inserts for the same normalized key win.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(normalize_key(key), value.into());
    }

    /// Inserts a value and returns the updated map.
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Returns the trimmed value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&normalize_key(key)).map(|value| value.trim())
    }

    /// Returns the trimmed value for `key`, or `None` when missing or blank.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|value| !value.is_empty())
    }

    /// Returns whether a value exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(&normalize_key(key))
    }
}

impl<K, V> FromIterator<(K, V)> for FieldMap
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key.as_ref(), value);
        }
        map
    }
}

/// Normalizes a column name so `"Housing"`, `" housing "` and `"HOUSING"` match.
pub fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

/// An amount that could not be parsed and was replaced with zero.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldIssue {
    field: &'static str,
    raw: Option<String>,
}

impl FieldIssue {
    /// Name of the affected field.
    pub fn field(&self) -> &'static str {
        self.field
    }

    /// The offending raw value, or `None` when the field was absent.
    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.raw {
            Some(raw) => write!(f, "{}: '{}' is not a number, using 0", self.field, raw),
            None => write!(f, "{}: missing, using 0", self.field),
        }
    }
}

/// A record built from fields together with the substitutions made along the way.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ingested {
    pub record: PayslipRecord,
    pub issues: Vec<FieldIssue>,
}

/// Parses an amount such as `"400000"`, `" 1,234.50 "` or `"2.5e3"`.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|ch| *ch != ',' && *ch != '_')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}

fn tolerant_amount(fields: &FieldMap, name: &'static str, issues: &mut Vec<FieldIssue>) -> Decimal {
    match fields.non_empty(name) {
        Some(raw) => parse_amount(raw).unwrap_or_else(|| {
            issues.push(FieldIssue {
                field: name,
                raw: Some(raw.to_owned()),
            });
            Decimal::ZERO
        }),
        None => {
            issues.push(FieldIssue {
                field: name,
                raw: None,
            });
            Decimal::ZERO
        }
    }
}

impl PayslipRecord {
    /// Builds a record from named fields plus the shared period.
    ///
    /// Unparseable or missing amounts become zero and are listed in [`Ingested::issues`].
    /// `total_earnings`, `total_deductions` and `net_pay` fields are ignored. The only error is
    /// a total too large for a [`Decimal`].
    pub fn from_fields(
        fields: &FieldMap,
        period: &PeriodFields,
    ) -> Result<Ingested, AmountOverflow> {
        let mut issues = Vec::new();

        let earnings = Earnings {
            basic_pay: tolerant_amount(fields, BASIC_PAY, &mut issues),
            housing: tolerant_amount(fields, HOUSING, &mut issues),
            transport: tolerant_amount(fields, TRANSPORT, &mut issues),
            other_allowances: tolerant_amount(fields, OTHER_ALLOWANCES, &mut issues),
        };
        let deductions = Deductions {
            tax: tolerant_amount(fields, TAX, &mut issues),
            employee_pension: tolerant_amount(fields, EMPLOYEE_PENSION, &mut issues),
            other_deductions: tolerant_amount(fields, OTHER_DEDUCTIONS, &mut issues),
        };

        let employee_name = fields.get(EMPLOYEE_NAME).unwrap_or_default();
        let employee_id = fields.get(EMPLOYEE_ID).unwrap_or_default();

        for issue in &issues {
            warn!("{} for employee '{}'", issue, employee_name);
        }

        Ok(Ingested {
            record: PayslipRecord::new(
                employee_name,
                employee_id,
                period.clone(),
                earnings,
                deductions,
            )?,
            issues,
        })
    }
}
