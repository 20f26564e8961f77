use chrono::{Datelike, NaiveDate};

/// System prompt for the reporting assistant.
///
/// Carries today's date so the model can resolve relative ranges ("last 3
/// months", "Q2") into the four-integer tool arguments, and pins down output
/// formatting so the front end can render answers verbatim.
pub fn build_system_prompt(today: NaiveDate) -> String {
    format!(
        "You are a financial analyst assistant. Today's date is {} (month {}, year {}).\n\
         \n\
         When users ask questions without specifying dates:\n\
         - \"last 3 months\" means the last 3 complete months\n\
         - \"this quarter\" or \"Q1/Q2/Q3/Q4\" refers to the appropriate quarter\n\
         - \"this year\" means January through December of current year\n\
         - If they just say a month name without a year, assume current year\n\
         \n\
         IMPORTANT FORMATTING RULES:\n\
         - Do not use asterisks (*) or underscores (_) for emphasis\n\
         - Use plain text only with proper spacing between all words\n\
         - Format numbers with commas: $3,990,000\n\
         - Do NOT include any JSON, code blocks, or chart configurations in your response\n\
         - Do NOT mention or describe charts - they are generated automatically\n\
         - Only provide the conversational answer to the user's question\n\
         \n\
         Provide clear, conversational answers based on the financial data you retrieve.",
        today.format("%B %d, %Y"),
        today.month(),
        today.year()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_carries_current_date() {
        let prompt = build_system_prompt(NaiveDate::from_ymd_opt(2025, 6, 15).unwrap());
        assert!(prompt.contains("June 15, 2025"));
        assert!(prompt.contains("month 6, year 2025"));
        assert!(prompt.contains("last 3 months"));
    }
}
