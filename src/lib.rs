//! # CFO Copilot
//!
//! A conversational financial-reporting engine. The core is a set of pure
//! query functions over four monthly tables (actual transactions, budget
//! transactions, cash balances, FX rates): revenue vs budget, gross margin,
//! opex breakdown, cash runway and EBITDA, all converted to USD. On top of
//! that, an optional LLM-driven agent (behind the `openai` feature) maps
//! natural-language questions onto those functions via tool calling and
//! turns the results into prose plus a chart suggestion.
//!
//! ## Core Concepts
//!
//! - **Snapshot**: the four tables bundled as one immutable value; every
//!   query borrows it, so results are pure functions of data + arguments
//! - **Reporting period**: an inclusive month range, always supplied as four
//!   integers (start month/year, end month/year)
//! - **Strict conversion**: non-USD amounts require exactly one FX rate per
//!   (month, currency); there is no fallback rate
//!
//! ## Example
//!
//! ```rust,ignore
//! use cfo_copilot::{CsvDataSource, ReportingPeriod, engine};
//!
//! let snapshot = CsvDataSource::new("fixtures").load()?;
//! let period = ReportingPeriod::new(1, 2025, 6, 2025)?;
//!
//! let ebitda = engine::ebitda(&snapshot, &period)?;
//! println!("EBITDA: ${:.0}", ebitda.ebitda_usd);
//!
//! let margin = engine::gross_margin_by_month(&snapshot, &period)?;
//! for (month, percent) in &margin {
//!     println!("{}: {:.2}%", month, percent);
//! }
//! ```

pub mod engine;
pub mod error;
pub mod loader;
pub mod model;

#[cfg(feature = "openai")]
pub mod agent;

pub use engine::{
    cash_runway, convert_all_to_usd, convert_to_usd, ebitda, gross_margin_aggregate,
    gross_margin_by_month, opex_by_category, revenue_vs_budget, CashRunway, Ebitda,
    GrossMarginAggregate, ReportingPeriod, RevenueVsBudget,
};
pub use error::{CfoError, Result};
pub use loader::CsvDataSource;
pub use model::{AccountCategory, CashBalance, FinancialSnapshot, FxRate, Month, Transaction};

#[cfg(feature = "openai")]
pub use agent::{AgentReply, CfoAgent, ChartConfig, OpenAiClient};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_to_end_reporting() {
        let jan = Month::new(2025, 1).unwrap();
        let feb = Month::new(2025, 2).unwrap();
        let txn = |month, tag: &str, amount, currency: &str| Transaction {
            month,
            category: AccountCategory::from(tag),
            amount,
            currency: currency.to_string(),
        };

        let snapshot = FinancialSnapshot {
            actuals: vec![
                txn(jan, "Revenue", 200_000.0, "USD"),
                txn(jan, "Revenue", 50_000.0, "EUR"),
                txn(jan, "COGS", 80_000.0, "USD"),
                txn(jan, "Opex:Marketing", 30_000.0, "USD"),
                txn(jan, "Opex:R&D", 40_000.0, "USD"),
                txn(feb, "Revenue", 220_000.0, "USD"),
                txn(feb, "COGS", 90_000.0, "USD"),
                txn(feb, "Opex:Marketing", 35_000.0, "USD"),
            ],
            budget: vec![
                txn(jan, "Revenue", 240_000.0, "USD"),
                txn(feb, "Revenue", 240_000.0, "USD"),
            ],
            cash: vec![CashBalance {
                month: feb,
                cash_usd: 1_000_000.0,
            }],
            fx_rates: vec![FxRate {
                month: jan,
                currency: "EUR".to_string(),
                rate_to_usd: 1.2,
            }],
        };

        let period = ReportingPeriod::new(1, 2025, 2, 2025).unwrap();

        let rvb = revenue_vs_budget(&snapshot, &period).unwrap();
        assert!((rvb.actual_usd - 480_000.0).abs() < 1e-9);
        assert_eq!(rvb.budget_usd, 480_000.0);
        assert!((rvb.difference - 0.0).abs() < 1e-9);

        let result = ebitda(&snapshot, &period).unwrap();
        let opex = opex_by_category(&snapshot, &period).unwrap();
        let opex_total: f64 = opex.values().sum();
        assert!((opex_total - result.total_opex).abs() < 1e-9);

        let margin = gross_margin_by_month(&snapshot, &period).unwrap();
        assert_eq!(margin.len(), 2);
    }
}
