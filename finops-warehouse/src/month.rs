//! Validated `YYYY-MM` billing months.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WarehouseError;

/// A billing month in `YYYY-MM` form.
///
/// ```rust
/// use finops_warehouse::InvoiceMonth;
///
/// let month: InvoiceMonth = "2025-03".parse().unwrap();
/// assert_eq!(month.as_str(), "2025-03");
/// assert!("2025-13".parse::<InvoiceMonth>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InvoiceMonth(String);

impl InvoiceMonth {
    /// Build a month from numeric parts.
    pub fn from_parts(year: u16, month: u8) -> Result<Self, WarehouseError> {
        format!("{year:04}-{month:02}").parse()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The month after this one.
    pub fn next(&self) -> Self {
        let (year, month) = self.parts();
        if month == 12 {
            Self(format!("{:04}-01", year + 1))
        } else {
            Self(format!("{year:04}-{:02}", month + 1))
        }
    }

    fn parts(&self) -> (u16, u8) {
        // validated on construction
        let year = self.0[..4].parse().unwrap_or(0);
        let month = self.0[5..].parse().unwrap_or(1);
        (year, month)
    }
}

impl FromStr for InvoiceMonth {
    type Err = WarehouseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        let shaped = bytes.len() == 7
            && bytes[4] == b'-'
            && bytes[..4].iter().all(u8::is_ascii_digit)
            && bytes[5..].iter().all(u8::is_ascii_digit);
        if !shaped {
            return Err(WarehouseError::InvalidMonth(s.to_string()));
        }
        let month: u8 = s[5..].parse().map_err(|_| WarehouseError::InvalidMonth(s.to_string()))?;
        if !(1..=12).contains(&month) {
            return Err(WarehouseError::InvalidMonth(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for InvoiceMonth {
    type Error = WarehouseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<InvoiceMonth> for String {
    fn from(month: InvoiceMonth) -> Self {
        month.0
    }
}

impl fmt::Display for InvoiceMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_months() {
        for ok in ["2025-01", "1999-12", "2024-05"] {
            assert_eq!(ok.parse::<InvoiceMonth>().unwrap().as_str(), ok);
        }
    }

    #[test]
    fn rejects_malformed_months() {
        for bad in ["202405", "2024-5", "2024-00", "2024-13", "24-05-01", "abcd-ef", ""] {
            assert!(
                matches!(bad.parse::<InvoiceMonth>(), Err(WarehouseError::InvalidMonth(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn next_rolls_over_year() {
        let dec: InvoiceMonth = "2024-12".parse().unwrap();
        assert_eq!(dec.next().as_str(), "2025-01");
        assert_eq!(InvoiceMonth::from_parts(2025, 1).unwrap().next().as_str(), "2025-02");
    }

    #[test]
    fn serde_validates() {
        let month: InvoiceMonth = serde_json::from_str("\"2025-06\"").unwrap();
        assert_eq!(serde_json::to_string(&month).unwrap(), "\"2025-06\"");
        assert!(serde_json::from_str::<InvoiceMonth>("\"2025-6\"").is_err());
    }
}
