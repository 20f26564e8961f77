pub mod chart;
pub mod client;
pub mod orchestrator;
pub mod prompts;
pub mod tools;
pub mod types;

pub use chart::{ChartConfig, ChartData};
pub use client::OpenAiClient;
pub use orchestrator::{AgentReply, CfoAgent};
pub use tools::PeriodArgs;
