use crate::error::{CfoError, Result};
use chrono::{Datelike, NaiveDate};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A calendar month, the granularity every table in the system is keyed on.
///
/// Renders and parses as `"YYYY-MM"`, which is also its JSON form (including
/// as a map key). Construction rejects month numbers outside 1-12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(CfoError::InvalidMonth(month));
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First calendar day of this month.
    pub fn first_day(&self) -> NaiveDate {
        // Safe: month is validated at construction.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).expect("validated month")
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Month {
    type Err = CfoError;

    fn from_str(s: &str) -> Result<Self> {
        let err = || CfoError::MonthParse(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(err)?;
        let year: i32 = year.parse().map_err(|_| err())?;
        let month: u32 = month.parse().map_err(|_| err())?;
        if !(1..=12).contains(&month) {
            return Err(err());
        }
        Ok(Self { year, month })
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct MonthVisitor;

impl Visitor<'_> for MonthVisitor {
    type Value = Month;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a month string in YYYY-MM format")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Month, E> {
        v.parse().map_err(|_| E::custom(format!("invalid month '{}'", v)))
    }
}

impl<'de> Deserialize<'de> for Month {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_str(MonthVisitor)
    }
}

/// Two-level account classification.
///
/// The source data encodes this as a single tag: `"Revenue"`, `"COGS"`, or
/// `"Opex:<subcategory>"`. Matching is exact (no trimming, no case folding);
/// only the first `Opex:` prefix is stripped. Tags outside the taxonomy are
/// preserved as `Other` so they load cleanly but never aggregate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AccountCategory {
    Revenue,
    Cogs,
    Opex(String),
    Other(String),
}

impl AccountCategory {
    pub fn is_opex(&self) -> bool {
        matches!(self, Self::Opex(_))
    }
}

impl fmt::Display for AccountCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Revenue => f.write_str("Revenue"),
            Self::Cogs => f.write_str("COGS"),
            Self::Opex(sub) => write!(f, "Opex:{}", sub),
            Self::Other(tag) => f.write_str(tag),
        }
    }
}

impl From<&str> for AccountCategory {
    fn from(tag: &str) -> Self {
        match tag {
            "Revenue" => Self::Revenue,
            "COGS" => Self::Cogs,
            _ => match tag.strip_prefix("Opex:") {
                Some(sub) => Self::Opex(sub.to_string()),
                None => Self::Other(tag.to_string()),
            },
        }
    }
}

impl Serialize for AccountCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AccountCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Self::from(tag.as_str()))
    }
}

/// One realized or budgeted transaction line.
///
/// A malformed amount cell is loaded as `f64::NAN` rather than rejected; the
/// strictness lives in the aggregation layer, not the loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub month: Month,
    #[serde(rename = "account_category")]
    pub category: AccountCategory,
    pub amount: f64,
    pub currency: String,
}

/// Month-end cash position, already in USD.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashBalance {
    pub month: Month,
    pub cash_usd: f64,
}

/// Multiplicative conversion factor: `amount * rate_to_usd` is the USD value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FxRate {
    pub month: Month,
    pub currency: String,
    pub rate_to_usd: f64,
}

/// The four record sets the engine queries, bundled as one read-only value.
///
/// Every engine function borrows a snapshot instead of reaching into ambient
/// state, so queries are pure and trivially testable against synthetic data.
#[derive(Debug, Clone, Default)]
pub struct FinancialSnapshot {
    pub actuals: Vec<Transaction>,
    pub budget: Vec<Transaction>,
    pub cash: Vec<CashBalance>,
    pub fx_rates: Vec<FxRate>,
}
