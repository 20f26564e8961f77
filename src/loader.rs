//! CSV data provider.
//!
//! Loads the four tables the engine queries: `actuals.csv`, `budget.csv`,
//! `cash.csv` and `fx.csv`. Loading is tolerant, aggregation is strict: a
//! cell that should be numeric but isn't becomes `f64::NAN` rather than a
//! load failure, and a row whose month cannot be parsed is dropped. Both
//! cases are logged.

use crate::error::Result;
use crate::model::{AccountCategory, CashBalance, FinancialSnapshot, FxRate, Month, Transaction};
use log::{info, warn};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
struct RawTransaction {
    month: String,
    account_category: String,
    amount: String,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct RawCashBalance {
    month: String,
    cash_usd: String,
}

#[derive(Debug, Deserialize)]
struct RawFxRate {
    month: String,
    currency: String,
    rate_to_usd: String,
}

/// Reads a [`FinancialSnapshot`] from a directory of CSV files.
///
/// Each `load` call re-reads all four files, so callers decide the snapshot
/// lifecycle: load once and share for pure repeated queries, or reload before
/// a query to pick up source changes.
#[derive(Debug, Clone)]
pub struct CsvDataSource {
    dir: PathBuf,
}

impl CsvDataSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn load(&self) -> Result<FinancialSnapshot> {
        let snapshot = FinancialSnapshot {
            actuals: self.load_transactions("actuals.csv")?,
            budget: self.load_transactions("budget.csv")?,
            cash: self.load_cash("cash.csv")?,
            fx_rates: self.load_fx("fx.csv")?,
        };
        info!(
            "loaded snapshot from {}: {} actuals, {} budget, {} cash, {} fx rows",
            self.dir.display(),
            snapshot.actuals.len(),
            snapshot.budget.len(),
            snapshot.cash.len(),
            snapshot.fx_rates.len()
        );
        Ok(snapshot)
    }

    fn load_transactions(&self, file: &str) -> Result<Vec<Transaction>> {
        let mut rows = Vec::new();
        for record in csv::Reader::from_path(self.path(file))?.deserialize() {
            let raw: RawTransaction = record?;
            let Some(month) = parse_month(&raw.month, file) else {
                continue;
            };
            rows.push(Transaction {
                month,
                category: AccountCategory::from(raw.account_category.as_str()),
                amount: coerce_numeric(&raw.amount, "amount", file),
                currency: raw.currency,
            });
        }
        Ok(rows)
    }

    fn load_cash(&self, file: &str) -> Result<Vec<CashBalance>> {
        let mut rows = Vec::new();
        for record in csv::Reader::from_path(self.path(file))?.deserialize() {
            let raw: RawCashBalance = record?;
            let Some(month) = parse_month(&raw.month, file) else {
                continue;
            };
            rows.push(CashBalance {
                month,
                cash_usd: coerce_numeric(&raw.cash_usd, "cash_usd", file),
            });
        }
        Ok(rows)
    }

    fn load_fx(&self, file: &str) -> Result<Vec<FxRate>> {
        let mut rows = Vec::new();
        for record in csv::Reader::from_path(self.path(file))?.deserialize() {
            let raw: RawFxRate = record?;
            let Some(month) = parse_month(&raw.month, file) else {
                continue;
            };
            rows.push(FxRate {
                month,
                currency: raw.currency,
                rate_to_usd: coerce_numeric(&raw.rate_to_usd, "rate_to_usd", file),
            });
        }
        Ok(rows)
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }
}

/// Numeric coercion with a NaN placeholder for malformed cells.
fn coerce_numeric(raw: &str, column: &str, file: &str) -> f64 {
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!("{}: non-numeric {} value '{}', coerced to NaN", file, column, raw);
            f64::NAN
        }
    }
}

fn parse_month(raw: &str, file: &str) -> Option<Month> {
    match raw.parse() {
        Ok(month) => Some(month),
        Err(_) => {
            warn!("{}: unparseable month '{}', row skipped", file, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn write_fixture(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn test_load_four_tables() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(
            dir.path(),
            "actuals.csv",
            "month,account_category,amount,currency\n\
             2025-01,Revenue,100000,USD\n\
             2025-01,Opex:Marketing,20000,EUR\n",
        );
        write_fixture(
            dir.path(),
            "budget.csv",
            "month,account_category,amount,currency\n2025-01,Revenue,90000,USD\n",
        );
        write_fixture(dir.path(), "cash.csv", "month,cash_usd\n2025-01,500000\n");
        write_fixture(
            dir.path(),
            "fx.csv",
            "month,currency,rate_to_usd\n2025-01,EUR,1.1\n",
        );

        let snapshot = CsvDataSource::new(dir.path()).load().unwrap();
        assert_eq!(snapshot.actuals.len(), 2);
        assert_eq!(snapshot.budget.len(), 1);
        assert_eq!(snapshot.cash.len(), 1);
        assert_eq!(snapshot.fx_rates.len(), 1);
        assert_eq!(
            snapshot.actuals[1].category,
            AccountCategory::Opex("Marketing".to_string())
        );
    }

    #[test]
    fn test_malformed_amount_becomes_nan() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(
            dir.path(),
            "actuals.csv",
            "month,account_category,amount,currency\n2025-01,Revenue,not-a-number,USD\n",
        );
        write_fixture(
            dir.path(),
            "budget.csv",
            "month,account_category,amount,currency\n",
        );
        write_fixture(dir.path(), "cash.csv", "month,cash_usd\n");
        write_fixture(dir.path(), "fx.csv", "month,currency,rate_to_usd\n");

        let snapshot = CsvDataSource::new(dir.path()).load().unwrap();
        assert_eq!(snapshot.actuals.len(), 1);
        assert!(snapshot.actuals[0].amount.is_nan());
    }

    #[test]
    fn test_unparseable_month_row_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(
            dir.path(),
            "actuals.csv",
            "month,account_category,amount,currency\n\
             garbage,Revenue,1,USD\n\
             2025-02,Revenue,2,USD\n",
        );
        write_fixture(
            dir.path(),
            "budget.csv",
            "month,account_category,amount,currency\n",
        );
        write_fixture(dir.path(), "cash.csv", "month,cash_usd\n");
        write_fixture(dir.path(), "fx.csv", "month,currency,rate_to_usd\n");

        let snapshot = CsvDataSource::new(dir.path()).load().unwrap();
        assert_eq!(snapshot.actuals.len(), 1);
        assert_eq!(snapshot.actuals[0].amount, 2.0);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CsvDataSource::new(dir.path()).load().is_err());
    }
}
