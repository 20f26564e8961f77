//! Chart suggestion for the front end.
//!
//! Two sources, in order: a chart configuration the model embedded in its
//! free-text answer (despite being told not to), then a fixed template keyed
//! on the first tool executed for the question. The template shapes are an
//! external contract with the rendering layer.

use crate::agent::tools;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    pub chart_type: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_label: Option<String>,
    pub data: ChartData,
}

/// Pick a chart for the answer, or `None` when nothing was computed.
pub fn suggest_chart(answer: &str, collected: &[(String, Value)]) -> Option<ChartConfig> {
    if let Some(config) = embedded_config(answer) {
        return Some(config);
    }
    let (first_name, first_result) = collected.first()?;
    template_for(first_name, first_result)
}

/// Rescue a configuration object embedded in free text: widest brace span,
/// must parse and carry a chart_type.
fn embedded_config(answer: &str) -> Option<ChartConfig> {
    let start = answer.find('{')?;
    let end = answer.rfind('}')?;
    if end <= start {
        return None;
    }
    let value: Value = serde_json::from_str(&answer[start..=end]).ok()?;
    value.get("chart_type")?;
    serde_json::from_value(value).ok()
}

fn template_for(tool: &str, result: &Value) -> Option<ChartConfig> {
    match tool {
        tools::REVENUE_VS_BUDGET => Some(ChartConfig {
            chart_type: "bar".to_string(),
            title: "Revenue: Actual vs Budget".to_string(),
            x_label: Some("Category".to_string()),
            y_label: Some("Amount (USD)".to_string()),
            data: ChartData {
                labels: vec!["Actual".to_string(), "Budget".to_string()],
                values: vec![num(result, "actual_usd")?, num(result, "budget_usd")?],
            },
        }),
        tools::GROSS_MARGIN => {
            let trend = result.as_object()?;
            Some(ChartConfig {
                chart_type: "line".to_string(),
                title: "Gross Margin Trend".to_string(),
                x_label: Some("Month".to_string()),
                y_label: Some("Margin %".to_string()),
                data: ChartData {
                    labels: trend.keys().cloned().collect(),
                    values: trend.values().filter_map(Value::as_f64).collect(),
                },
            })
        }
        tools::OPEX_BY_CATEGORY => {
            let totals = result.as_object()?;
            Some(ChartConfig {
                chart_type: "pie".to_string(),
                title: "Operating Expenses by Category".to_string(),
                x_label: None,
                y_label: None,
                data: ChartData {
                    labels: totals.keys().cloned().collect(),
                    values: totals.values().filter_map(Value::as_f64).collect(),
                },
            })
        }
        tools::EBITDA => Some(ChartConfig {
            chart_type: "bar".to_string(),
            title: "EBITDA Breakdown".to_string(),
            x_label: Some("Component".to_string()),
            y_label: Some("Amount (USD)".to_string()),
            data: ChartData {
                labels: vec![
                    "Revenue".to_string(),
                    "COGS".to_string(),
                    "OpEx".to_string(),
                    "EBITDA".to_string(),
                ],
                values: vec![
                    num(result, "total_revenue")?,
                    -num(result, "total_cogs")?,
                    -num(result, "total_opex")?,
                    num(result, "ebitda_usd")?,
                ],
            },
        }),
        tools::CASH_RUNWAY => Some(ChartConfig {
            chart_type: "bar".to_string(),
            title: "Cash Runway Analysis".to_string(),
            x_label: Some("Metric".to_string()),
            y_label: Some("Amount".to_string()),
            data: ChartData {
                labels: vec!["Current Cash".to_string(), "Monthly Flow".to_string()],
                values: vec![
                    num(result, "current_cash")?,
                    num(result, "monthly_cash_flow")?.abs(),
                ],
            },
        }),
        tools::GROSS_MARGIN_AGGREGATE => {
            let revenue = num(result, "total_revenue")?;
            let cogs = num(result, "total_cogs")?;
            Some(ChartConfig {
                chart_type: "bar".to_string(),
                title: format!("Gross Margin: {}%", num(result, "margin_percent")?),
                x_label: Some("Metric".to_string()),
                y_label: Some("Amount (USD)".to_string()),
                data: ChartData {
                    labels: vec![
                        "Revenue".to_string(),
                        "COGS".to_string(),
                        "Gross Profit".to_string(),
                    ],
                    values: vec![revenue, cogs, revenue - cogs],
                },
            })
        }
        _ => None,
    }
}

fn num(result: &Value, key: &str) -> Option<f64> {
    result.get(key)?.as_f64()
}
