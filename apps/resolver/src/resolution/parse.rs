//! Parses raw backend output into a validated, normalized answer.

use chrono::NaiveDate;
use serde_json::Value;
use thiserror::Error;

use crate::prompting::{Question, QuestionKind};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum ParseFailure {
    #[error("response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("response is not a JSON object")]
    NotAnObject,

    #[error("expected exactly one key, found {0}")]
    KeyCount(usize),

    #[error("expected {expected} for a {kind:?} question, found {found}")]
    Shape {
        kind: QuestionKind,
        expected: &'static str,
        found: &'static str,
    },

    #[error("'{0}' is not a YYYY-MM-DD date")]
    InvalidDate(String),

    #[error("null is not allowed for a required {0:?} question")]
    NullNotAllowed(QuestionKind),
}

/// Parses one payload entry against the schema of `question`'s kind.
///
/// Returns the normalized answer; `Value::Null` only for an optional date left blank.
pub fn parse_response(
    raw: &str,
    question: &Question,
    kind: QuestionKind,
) -> Result<Value, ParseFailure> {
    let parsed: Value = serde_json::from_str(strip_json_fences(raw))?;
    let object = parsed.as_object().ok_or(ParseFailure::NotAnObject)?;
    if object.len() != 1 {
        return Err(ParseFailure::KeyCount(object.len()));
    }
    let Some(value) = object.values().next() else {
        return Err(ParseFailure::KeyCount(0));
    };

    match kind {
        QuestionKind::MultiChoice => match value {
            Value::Array(items) => Ok(Value::Array(
                items
                    .iter()
                    .map(|item| normalize_chars(&stringify(item)))
                    .filter(|item| !is_placeholder(item))
                    .map(Value::String)
                    .collect(),
            )),
            other => Err(shape_error(kind, "an array", other)),
        },
        QuestionKind::Date => match value {
            Value::Null if question.required => Err(ParseFailure::NullNotAllowed(kind)),
            Value::Null => Ok(Value::Null),
            Value::String(s) => {
                let date = normalize_chars(s.trim());
                NaiveDate::parse_from_str(&date, DATE_FORMAT)
                    .map_err(|_| ParseFailure::InvalidDate(date.clone()))?;
                Ok(Value::String(date))
            }
            other => Err(shape_error(kind, "a string or null", other)),
        },
        QuestionKind::Scalar | QuestionKind::Textarea | QuestionKind::SingleChoice => {
            match value {
                Value::String(_) | Value::Number(_) | Value::Bool(_) => {
                    Ok(Value::String(scrub(normalize_chars(&stringify(value)))))
                }
                other => Err(shape_error(kind, "a string", other)),
            }
        }
    }
}

/// Maps smart punctuation to its plain ASCII equivalent.
pub fn normalize_chars(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2014}' | '\u{2013}' => '-',
            '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            other => other,
        })
        .collect()
}

/// Strips ```json ... ``` or ``` ... ``` code fences from backend output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));

    match inner {
        Some(stripped) => stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start()),
        None => text,
    }
}

/// Template echoes and leaked placeholder URLs become empty answers.
fn scrub(text: String) -> String {
    if is_placeholder(&text) {
        String::new()
    } else {
        text
    }
}

fn is_placeholder(text: &str) -> bool {
    text == "string" || (text.contains("http") && text.contains("username"))
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn shape_error(kind: QuestionKind, expected: &'static str, found: &Value) -> ParseFailure {
    let found = match found {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    };
    ParseFailure::Shape {
        kind,
        expected,
        found,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn question(input_type: &str, required: bool) -> (Question, QuestionKind) {
        let q = Question {
            id: "q".to_string(),
            label_text: String::new(),
            input_type: input_type.to_string(),
            required,
            options: vec![],
            hints: vec![],
            relevant_paths: vec![],
        };
        let kind = q.kind().unwrap();
        (q, kind)
    }

    fn parse(raw: &str, input_type: &str, required: bool) -> Result<Value, ParseFailure> {
        let (q, kind) = question(input_type, required);
        parse_response(raw, &q, kind)
    }

    #[test]
    fn test_single_choice_value() {
        assert_eq!(parse(r#"{"value":"Python"}"#, "select", true).unwrap(), json!("Python"));
    }

    #[test]
    fn test_literal_string_echo_becomes_empty() {
        assert_eq!(parse(r#"{"value":"string"}"#, "text", true).unwrap(), json!(""));
    }

    #[test]
    fn test_leaked_username_url_becomes_empty() {
        let raw = r#"{"value":"https://github.com/username"}"#;
        assert_eq!(parse(raw, "url", true).unwrap(), json!(""));
        let real = r#"{"value":"https://github.com/kalp"}"#;
        assert_eq!(parse(real, "url", true).unwrap(), json!("https://github.com/kalp"));
    }

    #[test]
    fn test_smart_punctuation_is_normalized() {
        let raw = "{\"value\":\"I\u{2019}m a \u{201C}full\u{2014}stack\u{201D} dev \u{2013} 5y\"}";
        assert_eq!(
            parse(raw, "textarea", true).unwrap(),
            json!("I'm a \"full-stack\" dev - 5y")
        );
    }

    #[test]
    fn test_numbers_are_accepted_as_scalar_text() {
        assert_eq!(parse(r#"{"value": 5}"#, "number", true).unwrap(), json!("5"));
    }

    #[test]
    fn test_fenced_response_is_accepted() {
        let raw = "```json\n{\"value\": \"Kalp\"}\n```";
        assert_eq!(parse(raw, "text", true).unwrap(), json!("Kalp"));
    }

    #[test]
    fn test_multi_choice_values() {
        let raw = "{\"values\": [\"Remote\", \"string\", 3, \"On\u{2013}site\"]}";
        assert_eq!(
            parse(raw, "checkbox", true).unwrap(),
            json!(["Remote", "3", "On-site"])
        );
        assert_eq!(parse(r#"{"values": []}"#, "checkbox", false).unwrap(), json!([]));
    }

    #[test]
    fn test_multi_choice_rejects_scalar() {
        assert!(matches!(
            parse(r#"{"values": "Remote"}"#, "multiselect", true),
            Err(ParseFailure::Shape { expected: "an array", .. })
        ));
    }

    #[test]
    fn test_optional_date_null_is_none() {
        assert_eq!(parse(r#"{"value": null}"#, "date", false).unwrap(), Value::Null);
    }

    #[test]
    fn test_required_date_null_is_rejected() {
        assert!(matches!(
            parse(r#"{"value": null}"#, "date", true),
            Err(ParseFailure::NullNotAllowed(QuestionKind::Date))
        ));
    }

    #[test]
    fn test_date_must_be_iso() {
        assert_eq!(parse(r#"{"value": "2023-01-01"}"#, "date", true).unwrap(), json!("2023-01-01"));
        assert!(matches!(
            parse(r#"{"value": "01/02/2023"}"#, "date", true),
            Err(ParseFailure::InvalidDate(_))
        ));
        assert!(parse(r#"{"value": "string"}"#, "date", true).is_err());
    }

    #[test]
    fn test_scalar_null_is_a_shape_error() {
        assert!(matches!(
            parse(r#"{"value": null}"#, "text", true),
            Err(ParseFailure::Shape { found: "null", .. })
        ));
    }

    #[test]
    fn test_structural_failures() {
        assert!(matches!(parse("Sure! Here you go", "text", true), Err(ParseFailure::InvalidJson(_))));
        assert!(matches!(parse(r#"["Kalp"]"#, "text", true), Err(ParseFailure::NotAnObject)));
        assert!(matches!(parse("{}", "text", true), Err(ParseFailure::KeyCount(0))));
        assert!(matches!(
            parse(r#"{"value": "Kalp", "confidence": 0.9}"#, "text", true),
            Err(ParseFailure::KeyCount(2))
        ));
    }

    #[test]
    fn test_strip_json_fences_variants() {
        assert_eq!(strip_json_fences("```json\n{\"k\": 1}\n```"), "{\"k\": 1}");
        assert_eq!(strip_json_fences("```\n{\"k\": 1}\n```"), "{\"k\": 1}");
        assert_eq!(strip_json_fences("  {\"k\": 1} "), "{\"k\": 1}");
    }
}
