use std::sync::LazyLock;

use regex::Regex;

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)```json").expect("fence pattern is valid"));

/// Prompt for turning noisy extracted text into clean, readable output that
/// follows the user's query.
pub fn build_format_prompt(raw_text: &str, instruction: &str) -> String {
    format!(
        r#"You are an AI text cleaner and formatter.

Rules:
- Input will contain noisy PDF text with watermarks, headers, and irrelevant content. Remove all of that.
- Follow the user's query strictly (e.g., if they ask for MCQs, give only MCQs; if they ask for summary, give only clean summary).
- Always return clean, human-readable text.
- Do not output JSON or code blocks.
- Format nicely with clear labels (e.g., "Question 1:", "Option A:", "Answer:", etc. when MCQs are requested).
- Do not add extra explanations beyond what was requested.

User Query:
{instruction}

Extracted Text:
{raw_text}

"#
    )
}

/// Prompt asking for a JSON array of question objects.
pub fn build_question_prompt(raw_text: &str, instruction: &str) -> String {
    let additional = if instruction.trim().is_empty() {
        String::new()
    } else {
        format!("Additional instructions: {instruction}")
    };

    format!(
        r#"Extract questions and answers from the following text in the format specified below.
If the text is in Hindi, translate it to English before processing.

Text: """{raw_text}"""

Format the output as a JSON array of objects with the following structure:
[
    {{
        "question": "The question text",
        "options": ["Option 1", "Option 2", ...],
        "answer": "The correct answer",
        "explanation": "Explanation for the answer"
    }},
    ...
]

{additional}
"#
    )
}

/// Strip Markdown code fences the model wraps around JSON.
pub fn clean_json_response(text: &str) -> String {
    JSON_FENCE
        .replace_all(text, "")
        .replace("```", "")
        .trim()
        .to_string()
}
