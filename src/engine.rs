//! The query engine: pure filter/convert/aggregate functions over a
//! [`FinancialSnapshot`].
//!
//! Every entry point takes the snapshot by reference and returns an owned
//! result. Nothing here retries, caches, or recovers: a missing FX rate or a
//! collapsing denominator is an error for the caller to translate.

use crate::error::{CfoError, Result};
use crate::model::{AccountCategory, FinancialSnapshot, FxRate, Month, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inclusive month range, built from the four-integer argument contract every
/// reporting operation shares.
///
/// Construction fails fast on months outside 1-12 and on inverted ranges;
/// neither case is allowed to leak into date arithmetic downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportingPeriod {
    start: Month,
    end: Month,
}

impl ReportingPeriod {
    pub fn new(start_month: u32, start_year: i32, end_month: u32, end_year: i32) -> Result<Self> {
        Self::from_months(
            Month::new(start_year, start_month)?,
            Month::new(end_year, end_month)?,
        )
    }

    pub fn from_months(start: Month, end: Month) -> Result<Self> {
        if start > end {
            return Err(CfoError::InvalidPeriod { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> Month {
        self.start
    }

    pub fn end(&self) -> Month {
        self.end
    }

    /// Both endpoints are inside the period.
    pub fn contains(&self, month: Month) -> bool {
        self.start <= month && month <= self.end
    }
}

/// Convert a single amount to USD using the rate table.
///
/// USD amounts pass through untouched, with no lookup. Any other currency
/// requires exactly one rate row for its (month, currency) pair; zero or
/// several matches fail rather than guessing.
pub fn convert_to_usd(amount: f64, currency: &str, month: Month, fx_rates: &[FxRate]) -> Result<f64> {
    if currency == "USD" {
        return Ok(amount);
    }
    let mut matches = fx_rates
        .iter()
        .filter(|r| r.month == month && r.currency == currency);
    let rate = match (matches.next(), matches.next()) {
        (Some(rate), None) => rate,
        (None, _) => {
            return Err(CfoError::FxRateMissing {
                currency: currency.to_string(),
                month,
            })
        }
        (Some(_), Some(_)) => {
            return Err(CfoError::FxRateAmbiguous {
                currency: currency.to_string(),
                month,
                count: 2 + matches.count(),
            })
        }
    };
    Ok(amount * rate.rate_to_usd)
}

/// Batch variant of [`convert_to_usd`]: one USD amount per input row, same
/// order and count, input untouched.
pub fn convert_all_to_usd(rows: &[&Transaction], fx_rates: &[FxRate]) -> Result<Vec<f64>> {
    rows.iter()
        .map(|t| convert_to_usd(t.amount, &t.currency, t.month, fx_rates))
        .collect()
}

fn sum_usd<'a>(
    rows: impl Iterator<Item = &'a Transaction>,
    fx_rates: &[FxRate],
) -> Result<f64> {
    let mut total = 0.0;
    for t in rows {
        total += convert_to_usd(t.amount, &t.currency, t.month, fx_rates)?;
    }
    Ok(total)
}

/// Distinct months with actuals inside the period, ascending.
fn actual_months_in(snapshot: &FinancialSnapshot, period: &ReportingPeriod) -> Vec<Month> {
    let mut months: Vec<Month> = snapshot
        .actuals
        .iter()
        .filter(|t| period.contains(t.month))
        .map(|t| t.month)
        .collect();
    months.sort();
    months.dedup();
    months
}

fn round_dp(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueVsBudget {
    pub actual_usd: f64,
    pub budget_usd: f64,
    pub difference: f64,
    pub percent_diff: f64,
}

/// Actual vs budgeted revenue in USD for the period.
pub fn revenue_vs_budget(
    snapshot: &FinancialSnapshot,
    period: &ReportingPeriod,
) -> Result<RevenueVsBudget> {
    let actual_usd = sum_usd(
        snapshot
            .actuals
            .iter()
            .filter(|t| period.contains(t.month) && t.category == AccountCategory::Revenue),
        &snapshot.fx_rates,
    )?;
    let budget_usd = sum_usd(
        snapshot
            .budget
            .iter()
            .filter(|t| period.contains(t.month) && t.category == AccountCategory::Revenue),
        &snapshot.fx_rates,
    )?;

    if budget_usd == 0.0 {
        return Err(CfoError::ZeroDenominator("budgeted revenue".to_string()));
    }

    let difference = actual_usd - budget_usd;
    Ok(RevenueVsBudget {
        actual_usd,
        budget_usd,
        difference,
        percent_diff: (difference / budget_usd) * 100.0,
    })
}

/// Gross margin percentage per month, ascending, rounded to 2 decimal places.
///
/// Months with no actuals at all are absent from the result; a month whose
/// revenue sums to zero fails rather than producing a placeholder entry.
pub fn gross_margin_by_month(
    snapshot: &FinancialSnapshot,
    period: &ReportingPeriod,
) -> Result<BTreeMap<Month, f64>> {
    let mut trend = BTreeMap::new();
    for month in actual_months_in(snapshot, period) {
        let in_month = |category: AccountCategory| {
            snapshot
                .actuals
                .iter()
                .filter(move |t| t.month == month && t.category == category)
        };
        let revenue = sum_usd(in_month(AccountCategory::Revenue), &snapshot.fx_rates)?;
        let cogs = sum_usd(in_month(AccountCategory::Cogs), &snapshot.fx_rates)?;

        if revenue == 0.0 {
            return Err(CfoError::ZeroDenominator(format!("revenue for {}", month)));
        }
        let margin = (revenue - cogs) / revenue * 100.0;
        trend.insert(month, round_dp(margin, 2));
    }
    Ok(trend)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrossMarginAggregate {
    pub margin_percent: f64,
    pub total_revenue: f64,
    pub total_cogs: f64,
}

/// One gross margin figure for the whole period.
///
/// Rounded to 1 decimal place, unlike the 2 places of the monthly trend; the
/// two consumers expect different precisions.
pub fn gross_margin_aggregate(
    snapshot: &FinancialSnapshot,
    period: &ReportingPeriod,
) -> Result<GrossMarginAggregate> {
    let in_range = |category: AccountCategory| {
        snapshot
            .actuals
            .iter()
            .filter(move |t| period.contains(t.month) && t.category == category)
    };
    let total_revenue = sum_usd(in_range(AccountCategory::Revenue), &snapshot.fx_rates)?;
    let total_cogs = sum_usd(in_range(AccountCategory::Cogs), &snapshot.fx_rates)?;

    if total_revenue == 0.0 {
        return Err(CfoError::ZeroDenominator("revenue".to_string()));
    }
    let margin = (total_revenue - total_cogs) / total_revenue * 100.0;
    Ok(GrossMarginAggregate {
        margin_percent: round_dp(margin, 1),
        total_revenue,
        total_cogs,
    })
}

/// Operating expenses in USD, grouped by Opex subcategory.
///
/// Subcategories with no rows in the period are simply absent; there is no
/// zero-fill.
pub fn opex_by_category(
    snapshot: &FinancialSnapshot,
    period: &ReportingPeriod,
) -> Result<BTreeMap<String, f64>> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for t in snapshot.actuals.iter().filter(|t| period.contains(t.month)) {
        if let AccountCategory::Opex(subcategory) = &t.category {
            let usd = convert_to_usd(t.amount, &t.currency, t.month, &snapshot.fx_rates)?;
            *totals.entry(subcategory.clone()).or_insert(0.0) += usd;
        }
    }
    Ok(totals)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashRunway {
    pub current_cash: f64,
    pub monthly_cash_flow: f64,
    pub runway_months: f64,
}

/// Months of cash left at the burn rate observed over the period.
///
/// Current cash always comes from the latest row of the whole cash table,
/// not the queried period. A non-burning business has infinite runway.
pub fn cash_runway(snapshot: &FinancialSnapshot, period: &ReportingPeriod) -> Result<CashRunway> {
    let latest = snapshot
        .cash
        .iter()
        .max_by_key(|c| c.month)
        .ok_or(CfoError::CashBalanceMissing)?;
    let current_cash = latest.cash_usd;

    let months = actual_months_in(snapshot, period);
    if months.is_empty() {
        return Err(CfoError::EmptyPeriod {
            start: period.start(),
            end: period.end(),
        });
    }

    let mut flows = Vec::with_capacity(months.len());
    for month in months {
        let in_month = |pred: fn(&AccountCategory) -> bool| {
            snapshot
                .actuals
                .iter()
                .filter(move |t| t.month == month && pred(&t.category))
        };
        let revenue = sum_usd(
            in_month(|c| *c == AccountCategory::Revenue),
            &snapshot.fx_rates,
        )?;
        let cogs = sum_usd(in_month(|c| *c == AccountCategory::Cogs), &snapshot.fx_rates)?;
        let opex = sum_usd(in_month(AccountCategory::is_opex), &snapshot.fx_rates)?;
        flows.push(revenue - cogs - opex);
    }

    let monthly_cash_flow = flows.iter().sum::<f64>() / flows.len() as f64;
    let runway_months = if monthly_cash_flow < 0.0 {
        current_cash / monthly_cash_flow.abs()
    } else {
        f64::INFINITY
    };

    Ok(CashRunway {
        current_cash,
        monthly_cash_flow,
        runway_months,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ebitda {
    pub ebitda_usd: f64,
    pub total_revenue: f64,
    pub total_cogs: f64,
    pub total_opex: f64,
}

/// EBITDA approximated as Revenue - COGS - Opex over the period.
pub fn ebitda(snapshot: &FinancialSnapshot, period: &ReportingPeriod) -> Result<Ebitda> {
    let in_range: Vec<&Transaction> = snapshot
        .actuals
        .iter()
        .filter(|t| period.contains(t.month))
        .collect();

    let sum_where = |pred: fn(&AccountCategory) -> bool| {
        sum_usd(
            in_range.iter().copied().filter(|t| pred(&t.category)),
            &snapshot.fx_rates,
        )
    };
    let total_revenue = sum_where(|c| *c == AccountCategory::Revenue)?;
    let total_cogs = sum_where(|c| *c == AccountCategory::Cogs)?;
    let total_opex = sum_where(AccountCategory::is_opex)?;

    Ok(Ebitda {
        ebitda_usd: total_revenue - total_cogs - total_opex,
        total_revenue,
        total_cogs,
        total_opex,
    })
}
