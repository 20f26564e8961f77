use cfo_copilot::{CfoAgent, CsvDataSource, OpenAiClient};
use dotenv::dotenv;
use std::error::Error;
use std::io::{self, Write};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();

    let api_key = std::env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY must be set");
    let data_dir = std::env::var("CFO_DATA_DIR").unwrap_or_else(|_| "fixtures".to_string());

    let snapshot = CsvDataSource::new(&data_dir).load()?;
    println!(
        "💼 Loaded books from {}/ ({} actual rows).\n",
        data_dir,
        snapshot.actuals.len()
    );

    let client = OpenAiClient::new(api_key);
    let mut agent = CfoAgent::new(client, snapshot);

    println!("🤖 Ready! Ask about revenue, margins, opex, runway or EBITDA (type 'quit' to exit).");
    println!("------------------------------------------------------------------");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let question = input.trim();

        if question.eq_ignore_ascii_case("quit") || question.eq_ignore_ascii_case("exit") {
            break;
        }

        if question.is_empty() {
            continue;
        }

        println!("\nThinking...");

        match agent.ask(question).await {
            Ok(reply) => {
                println!("\n{}\n", reply.answer);
                if let Some(chart) = &reply.chart {
                    println!("📊 Suggested chart: {}", serde_json::to_string_pretty(chart)?);
                }
                println!("------------------------------------------------------------------");
            }
            Err(e) => {
                eprintln!("❌ Error: {}", e);
            }
        }
    }

    Ok(())
}
