//! Prompt rendering for the chat oracle.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::stats::{Statistic, StatisticItem};

use super::{ParameterRequest, SynthesisRequest};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Escapes chat-template control sequences in user-supplied text.
pub fn sanitize_for_prompt(text: &str) -> String {
    text.replace("<|", "< |")
        .replace("|>", "| >")
        .replace("<s>", "< s >")
        .replace("</s>", "< / s >")
        .replace("[INST]", "[ INST ]")
        .replace("[/INST]", "[ / INST ]")
        .replace("<<SYS>>", "< < SYS > >")
        .replace("<</SYS>>", "< < / SYS > >")
}

/// Grounds relative expressions ("this year", "last year") on `today`.
pub fn date_grounding(today: NaiveDate) -> String {
    format!(
        "Current Date: {compact} (Today is {iso})\n\
         - \"This year\" = {year}\n\
         - \"Last year\" = {last}\n\
         - Always calculate dates relative to Today.",
        compact = today.format("%Y%m%d"),
        iso = today.format("%Y-%m-%d"),
        year = today.year(),
        last = today.year() - 1,
    )
}

pub fn render_candidates(candidates: &[Statistic]) -> String {
    candidates
        .iter()
        .map(|s| {
            format!(
                "- {}: {} (Cycle: {})",
                s.code,
                sanitize_for_prompt(s.display_path()),
                s.cycle
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_items(items: &[StatisticItem]) -> String {
    items
        .iter()
        .map(|item| sanitize_for_prompt(&item.to_string()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn statistic_selection_messages(
    candidates: &[Statistic],
    query: &str,
    prior_error: Option<&str>,
) -> Vec<ChatMessage> {
    let system = "You are a Korean expert at selecting the most relevant economic statistic \
                  based on user queries.\n\
                  Respond ONLY with JSON: {\"code\": \"<statistic code or null>\", \"reason\": \"<why>\"}.\n\
                  The code MUST be one of the listed codes. If none fits, return null and explain why.";

    let user = format!(
        "User Query: {query}\n\n\
         Available Statistics:\n{options}\n\n\
         PREVIOUS ERROR (if any): {error}\n\n\
         Select the SINGLE best statistic that matches the user's intent.",
        query = sanitize_for_prompt(query),
        options = render_candidates(candidates),
        error = prior_error.map(sanitize_for_prompt).unwrap_or_else(|| "None".to_string()),
    );

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

pub fn parameter_selection_messages(request: &ParameterRequest<'_>) -> Vec<ChatMessage> {
    let system = format!(
        "You are a Korean expert at selecting appropriate economic data parameters.\n\
         {grounding}\n\n\
         Key rules:\n\
         - If country isn't specified, assume it's Korea.\n\
         - Format dates correctly: A(YYYY), S(YYYYSn), Q(YYYYQn), M(YYYYMM), SM(YYYYMMSn), D(YYYYMMDD).\n\
         - Use the statistic's cycle for every request.\n\
         - CHECK Available Range in items! Never request dates outside an item's range and never request future dates.\n\
         - If the user asks for \"recent\" data, use the most recent two years, ending at the item's last available date.\n\
         - If user asks for multiple items (e.g., \"GDP and unemployment\"), select multiple. Otherwise select one.\n\
         - If there was a previous error, adjust your parameters (different date format, item, or shorter range).\n\
         Respond ONLY with JSON: {{\"queries\": [{{\"cycle\": \"Q\", \"itemCode\": \"...\", \"itemName\": \"...\", \"startTime\": \"...\", \"endTime\": \"...\"}}]}}",
        grounding = date_grounding(request.today),
    );

    let user = format!(
        "User Query: {query}\n\n\
         Selected Statistic: {code} ({name})\n\
         Cycle: {cycle} (A=Annual, S=Semi-annual, Q=Quarter, M=Month, SM=Semi-month, D=Day)\n\n\
         Available Items:\n{items}\n\n\
         PREVIOUS ERROR (if any): {error}\n",
        query = sanitize_for_prompt(request.query),
        code = request.statistic.code,
        name = sanitize_for_prompt(&request.statistic.name),
        cycle = request.statistic.cycle,
        items = render_items(request.items),
        error = request
            .prior_error
            .map(sanitize_for_prompt)
            .unwrap_or_else(|| "None".to_string()),
    );

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

pub fn synthesis_messages(request: &SynthesisRequest<'_>) -> Vec<ChatMessage> {
    let system = format!(
        "You are a Korean Economic Statistics Expert.\n\
         You should answer the user's query by analyzing the provided statistics.\n\
         {grounding}\n\n\
         Key guidelines:\n\
         1. DATE AWARENESS: Always analyze data relative to the Current Date.\n\
         2. ANALYSIS RULES:\n\
            - Convert large values to Korean readable units (조, 억).\n\
            - If multiple items are provided, compare and analyze them together.\n\
            - PARTIAL DATA HANDLING: If data covers only PART of the requested period, present the available data first and say which part is missing.\n\
            - If no data is provided, say that no data was available. NEVER invent values.",
        grounding = date_grounding(request.today),
    );

    let statistic = request
        .statistic
        .map(|s| sanitize_for_prompt(s.display_path()))
        .unwrap_or_else(|| "(none selected)".to_string());
    let data = if request.blocks.is_empty() {
        "(no data was retrieved)".to_string()
    } else {
        request.blocks.join("\n---\n")
    };

    let user = format!(
        "User Query: {query}\n\
         Statistic: {statistic}\n\
         {data}\n\
         Analyze this data and answer the user's question.",
        query = sanitize_for_prompt(request.query),
    );

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

/// Returns the first balanced JSON object in `response`, or the whole text.
pub fn extract_json(response: &str) -> &str {
    let start = match response.find('{') {
        Some(idx) => idx,
        None => return response,
    };

    let mut depth = 0;
    let mut in_string = false;
    let mut escape_next = false;
    let mut end = response.len();

    for (i, c) in response[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    end = start + i + 1;
                    break;
                }
            }
            _ => {}
        }
    }

    &response[start..end]
}
