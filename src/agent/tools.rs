//! The six reporting operations exposed to the model as function tools.
//!
//! Tool names and argument shapes are an external contract: the front end
//! keys chart templates on the name of the last executed tool, so renaming
//! one here is a breaking change.

use crate::agent::types::{FunctionDefinition, ToolDefinition};
use crate::engine::{self, ReportingPeriod};
use crate::error::{CfoError, Result};
use crate::model::FinancialSnapshot;
use schemars::JsonSchema;
use serde::Deserialize;

pub const REVENUE_VS_BUDGET: &str = "get_revenue_vs_budget";
pub const GROSS_MARGIN: &str = "calculate_gross_margin";
pub const GROSS_MARGIN_AGGREGATE: &str = "calculate_gross_margin_aggregate";
pub const OPEX_BY_CATEGORY: &str = "opex_by_category";
pub const CASH_RUNWAY: &str = "calculate_cash_runway";
pub const EBITDA: &str = "calculate_ebitda";

/// Every reporting tool takes the same four integers.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct PeriodArgs {
    #[schemars(description = "Starting month (1-12)")]
    pub start_month: u32,

    #[schemars(description = "Starting year (e.g., 2025)")]
    pub start_year: i32,

    #[schemars(description = "Ending month (1-12)")]
    pub end_month: u32,

    #[schemars(description = "Ending year (e.g., 2025)")]
    pub end_year: i32,
}

impl PeriodArgs {
    pub fn period(&self) -> Result<ReportingPeriod> {
        ReportingPeriod::new(self.start_month, self.start_year, self.end_month, self.end_year)
    }
}

/// The tool catalog sent with every completion request.
pub fn definitions() -> Vec<ToolDefinition> {
    let specs = [
        (
            REVENUE_VS_BUDGET,
            "Compare actual revenue vs budgeted revenue for a specific time period. \
             Use this when users ask about revenue performance, how we did against budget, \
             or revenue targets.",
        ),
        (
            GROSS_MARGIN,
            "Calculate gross margin percentage for each month in a date range. Returns a \
             trend/breakdown by month. Use this when users ask about margin trends, monthly \
             margins, or how margins changed over time.",
        ),
        (
            GROSS_MARGIN_AGGREGATE,
            "Calculate a single aggregated gross margin percentage for an entire time period. \
             Use this when users ask for overall margin, total margin, or aggregate margin \
             for a period.",
        ),
        (
            OPEX_BY_CATEGORY,
            "Break down operating expenses by category (Marketing, Sales, R&D, etc.) for a \
             time period. Use when users ask about spending, opex breakdown, or where money \
             is going.",
        ),
        (
            CASH_RUNWAY,
            "Calculate how many months of cash runway remain based on current cash and burn \
             rate from a specific period. Use when users ask about runway, how long cash will \
             last, or burn rate.",
        ),
        (
            EBITDA,
            "Calculate EBITDA (Earnings Before Interest, Taxes, Depreciation, and \
             Amortization) for a time period. Use when users ask about profitability, EBITDA, \
             or operating profit.",
        ),
    ];

    let parameters = serde_json::to_value(schemars::schema_for!(PeriodArgs))
        .expect("period args schema serializes");

    specs
        .into_iter()
        .map(|(name, description)| ToolDefinition {
            kind: "function".to_string(),
            function: FunctionDefinition {
                name: name.to_string(),
                description: description.to_string(),
                parameters: parameters.clone(),
            },
        })
        .collect()
}

/// Run one requested tool against the snapshot and serialize its result.
///
/// Engine failures surface as `Err` here; the orchestrator decides whether to
/// abort or feed them back to the model.
pub fn dispatch(
    name: &str,
    args: &PeriodArgs,
    snapshot: &FinancialSnapshot,
) -> Result<serde_json::Value> {
    let period = args.period()?;
    let value = match name {
        REVENUE_VS_BUDGET => serde_json::to_value(engine::revenue_vs_budget(snapshot, &period)?)?,
        GROSS_MARGIN => serde_json::to_value(engine::gross_margin_by_month(snapshot, &period)?)?,
        GROSS_MARGIN_AGGREGATE => {
            serde_json::to_value(engine::gross_margin_aggregate(snapshot, &period)?)?
        }
        OPEX_BY_CATEGORY => serde_json::to_value(engine::opex_by_category(snapshot, &period)?)?,
        CASH_RUNWAY => serde_json::to_value(engine::cash_runway(snapshot, &period)?)?,
        EBITDA => serde_json::to_value(engine::ebitda(snapshot, &period)?)?,
        other => return Err(CfoError::UnknownTool(other.to_string())),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AccountCategory, Transaction};

    fn snapshot() -> FinancialSnapshot {
        let jan = crate::model::Month::new(2025, 1).unwrap();
        FinancialSnapshot {
            actuals: vec![
                Transaction {
                    month: jan,
                    category: AccountCategory::Revenue,
                    amount: 100_000.0,
                    currency: "USD".to_string(),
                },
                Transaction {
                    month: jan,
                    category: AccountCategory::Cogs,
                    amount: 40_000.0,
                    currency: "USD".to_string(),
                },
                Transaction {
                    month: jan,
                    category: AccountCategory::Opex("Marketing".to_string()),
                    amount: 10_000.0,
                    currency: "USD".to_string(),
                },
            ],
            budget: vec![Transaction {
                month: jan,
                category: AccountCategory::Revenue,
                amount: 90_000.0,
                currency: "USD".to_string(),
            }],
            cash: vec![crate::model::CashBalance {
                month: jan,
                cash_usd: 500_000.0,
            }],
            fx_rates: vec![],
        }
    }

    fn args() -> PeriodArgs {
        PeriodArgs {
            start_month: 1,
            start_year: 2025,
            end_month: 1,
            end_year: 2025,
        }
    }

    #[test]
    fn test_catalog_has_six_tools_with_shared_schema() {
        let tools = definitions();
        assert_eq!(tools.len(), 6);
        for tool in &tools {
            assert_eq!(tool.kind, "function");
            let params = serde_json::to_string(&tool.function.parameters).unwrap();
            assert!(params.contains("start_month"));
            assert!(params.contains("end_year"));
            assert!(params.contains("Starting month (1-12)"));
        }
        assert!(tools.iter().any(|t| t.function.name == EBITDA));
    }

    #[test]
    fn test_dispatch_routes_to_engine() {
        let result = dispatch(EBITDA, &args(), &snapshot()).unwrap();
        assert_eq!(result["ebitda_usd"], 50_000.0);
        assert_eq!(result["total_opex"], 10_000.0);

        let result = dispatch(REVENUE_VS_BUDGET, &args(), &snapshot()).unwrap();
        assert_eq!(result["difference"], 10_000.0);
    }

    #[test]
    fn test_dispatch_serializes_month_keyed_trend() {
        let result = dispatch(GROSS_MARGIN, &args(), &snapshot()).unwrap();
        assert_eq!(result["2025-01"], 60.0);
    }

    #[test]
    fn test_dispatch_rejects_unknown_tool() {
        assert!(matches!(
            dispatch("drop_tables", &args(), &snapshot()),
            Err(CfoError::UnknownTool(_))
        ));
    }

    #[test]
    fn test_args_parse_from_protocol_json() {
        let args: PeriodArgs = serde_json::from_str(
            r#"{"start_month":1,"start_year":2025,"end_month":3,"end_year":2025}"#,
        )
        .unwrap();
        assert!(args.period().is_ok());

        let inverted: PeriodArgs = serde_json::from_str(
            r#"{"start_month":6,"start_year":2025,"end_month":1,"end_year":2025}"#,
        )
        .unwrap();
        assert!(inverted.period().is_err());
    }
}
