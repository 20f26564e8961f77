//! The conversation loop: question in, prose + data + chart hint out.
//!
//! Each question runs an explicit two-state loop — ask the model, execute
//! whatever tools it requested, ask again — until the model answers with no
//! calls pending. The loop is capped at [`MAX_TOOL_ROUNDS`] so a pathological
//! provider response cannot run up unbounded cost.

use crate::agent::chart::{self, ChartConfig};
use crate::agent::client::OpenAiClient;
use crate::agent::prompts::build_system_prompt;
use crate::agent::tools::{self, PeriodArgs};
use crate::agent::types::{ChatMessage, ToolCall, ToolDefinition};
use crate::error::{CfoError, Result};
use crate::model::FinancialSnapshot;
use log::{debug, warn};
use serde_json::{json, Value};

pub const MAX_TOOL_ROUNDS: usize = 8;

/// Two entries per exchange (user + assistant), so 10 exchanges.
const HISTORY_LIMIT: usize = 20;

/// What one question produces: the model's prose, the raw result of every
/// tool it called (in call order), and a chart suggestion.
#[derive(Debug, Clone)]
pub struct AgentReply {
    pub answer: String,
    pub data: Vec<(String, Value)>,
    pub chart: Option<ChartConfig>,
}

pub struct CfoAgent {
    client: OpenAiClient,
    snapshot: FinancialSnapshot,
    tools: Vec<ToolDefinition>,
    history: Vec<ChatMessage>,
}

impl CfoAgent {
    /// The snapshot is injected once; every tool call during the agent's
    /// lifetime queries the same immutable data. Reload and rebuild the agent
    /// to pick up source changes.
    pub fn new(client: OpenAiClient, snapshot: FinancialSnapshot) -> Self {
        Self {
            client,
            snapshot,
            tools: tools::definitions(),
            history: Vec::new(),
        }
    }

    pub fn reset_conversation(&mut self) {
        self.history.clear();
    }

    pub async fn ask(&mut self, question: &str) -> Result<AgentReply> {
        let today = chrono::Local::now().date_naive();
        let mut messages = vec![ChatMessage::system(build_system_prompt(today))];
        messages.extend(self.history.iter().cloned());
        messages.push(ChatMessage::user(question));

        let mut collected: Vec<(String, Value)> = Vec::new();
        let mut reply = self.client.chat(messages.clone(), self.tools.clone()).await?;

        let mut rounds = 0;
        while !reply.requested_calls().is_empty() {
            rounds += 1;
            if rounds > MAX_TOOL_ROUNDS {
                return Err(CfoError::ToolLoopExceeded(MAX_TOOL_ROUNDS));
            }

            let calls = reply.requested_calls().to_vec();
            messages.push(reply);
            for call in &calls {
                debug!("executing tool call {} ({})", call.function.name, call.id);
                let result = execute_call(call, &self.snapshot);
                record(&mut collected, &call.function.name, result.clone());
                messages.push(ChatMessage::tool(
                    call.id.clone(),
                    call.function.name.clone(),
                    result.to_string(),
                ));
            }

            reply = self.client.chat(messages.clone(), self.tools.clone()).await?;
        }

        let answer = reply.content.unwrap_or_default();

        self.history.push(ChatMessage::user(question));
        self.history.push(ChatMessage::assistant(&answer));
        if self.history.len() > HISTORY_LIMIT {
            let excess = self.history.len() - HISTORY_LIMIT;
            self.history.drain(..excess);
        }

        let chart = chart::suggest_chart(&answer, &collected);
        Ok(AgentReply {
            answer,
            data: collected,
            chart,
        })
    }
}

/// Execute one requested call. Bad arguments and engine failures become an
/// error payload for the model instead of ending the conversation; the engine
/// itself stays strict, translation happens here.
fn execute_call(call: &ToolCall, snapshot: &FinancialSnapshot) -> Value {
    let parsed: std::result::Result<PeriodArgs, _> = serde_json::from_str(&call.function.arguments);
    let outcome = match parsed {
        Ok(args) => tools::dispatch(&call.function.name, &args, snapshot),
        Err(e) => {
            warn!(
                "unparseable arguments for {}: {}",
                call.function.name, call.function.arguments
            );
            return json!({ "error": format!("invalid arguments: {}", e) });
        }
    };
    match outcome {
        Ok(value) => value,
        Err(e) => {
            warn!("tool {} failed: {}", call.function.name, e);
            json!({ "error": e.to_string() })
        }
    }
}

/// Keep one slot per tool name, latest result wins, first-call order kept.
fn record(collected: &mut Vec<(String, Value)>, name: &str, value: Value) {
    match collected.iter_mut().find(|(existing, _)| existing == name) {
        Some(slot) => slot.1 = value,
        None => collected.push((name.to_string(), value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::types::FunctionCall;
    use crate::model::{AccountCategory, Month, Transaction};

    fn snapshot() -> FinancialSnapshot {
        let jan = Month::new(2025, 1).unwrap();
        FinancialSnapshot {
            actuals: vec![Transaction {
                month: jan,
                category: AccountCategory::Revenue,
                amount: 100_000.0,
                currency: "USD".to_string(),
            }],
            budget: vec![Transaction {
                month: jan,
                category: AccountCategory::Revenue,
                amount: 80_000.0,
                currency: "USD".to_string(),
            }],
            cash: vec![],
            fx_rates: vec![],
        }
    }

    fn call(name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: "call_1".to_string(),
            kind: "function".to_string(),
            function: FunctionCall {
                name: name.to_string(),
                arguments: arguments.to_string(),
            },
        }
    }

    #[test]
    fn test_execute_call_returns_engine_result() {
        let result = execute_call(
            &call(
                tools::REVENUE_VS_BUDGET,
                r#"{"start_month":1,"start_year":2025,"end_month":1,"end_year":2025}"#,
            ),
            &snapshot(),
        );
        assert_eq!(result["actual_usd"], 100_000.0);
        assert_eq!(result["difference"], 20_000.0);
    }

    #[test]
    fn test_execute_call_translates_engine_failure() {
        // No cash table: runway must come back as an error payload, not a panic.
        let result = execute_call(
            &call(
                tools::CASH_RUNWAY,
                r#"{"start_month":1,"start_year":2025,"end_month":1,"end_year":2025}"#,
            ),
            &snapshot(),
        );
        assert!(result["error"].as_str().unwrap().contains("cash balance"));
    }

    #[test]
    fn test_execute_call_translates_bad_arguments() {
        let result = execute_call(&call(tools::EBITDA, "not json"), &snapshot());
        assert!(result["error"].as_str().unwrap().contains("invalid arguments"));
    }

    #[test]
    fn test_record_keeps_first_call_order_and_latest_value() {
        let mut collected = Vec::new();
        record(&mut collected, "a", json!(1));
        record(&mut collected, "b", json!(2));
        record(&mut collected, "a", json!(3));
        assert_eq!(collected.len(), 2);
        assert_eq!(collected[0], ("a".to_string(), json!(3)));
        assert_eq!(collected[1], ("b".to_string(), json!(2)));
    }
}
