//! Typed JSON output from chat completions

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// A type the model can be asked to produce as a JSON object
pub trait StructuredOutput: DeserializeOwned {
    /// JSON shape appended to the system prompt
    fn json_shape() -> &'static str;

    /// Full instruction block describing the expected output
    fn format_instructions() -> String {
        format!(
            "Your response must be a single JSON object, with no markdown code fences and no \
             text before or after it. It must follow this shape:\n{}",
            Self::json_shape()
        )
    }
}

/// Extract and deserialize the JSON object contained in a model reply
///
/// Tolerates fenced code blocks and stray prose around the object.
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let body = extract_json(raw);

    serde_json::from_str(body).map_err(|e| {
        Error::LLMError(format!(
            "Failed to parse structured response: {} (response started with {:?})",
            e,
            raw.chars().take(80).collect::<String>()
        ))
    })
}

fn extract_json(raw: &str) -> &str {
    let trimmed = raw.trim();

    let unfenced = match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    };

    if unfenced.starts_with('{') || unfenced.starts_with('[') {
        return unfenced;
    }

    match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if end > start => &unfenced[start..=end],
        _ => unfenced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Answer {
        summary: String,
    }

    impl StructuredOutput for Answer {
        fn json_shape() -> &'static str {
            r#"{"summary": "string"}"#
        }
    }

    #[test]
    fn test_plain_json() {
        let answer: Answer = parse_structured(r#"{"summary": "ok"}"#).unwrap();
        assert_eq!(answer.summary, "ok");
    }

    #[test]
    fn test_fenced_json() {
        let raw = "```json\n{\"summary\": \"fenced\"}\n```";
        let answer: Answer = parse_structured(raw).unwrap();
        assert_eq!(answer.summary, "fenced");
    }

    #[test]
    fn test_json_with_prose() {
        let raw = "Here is your summary:\n{\"summary\": \"inner {braces}\"}\nHope it helps.";
        let answer: Answer = parse_structured(raw).unwrap();
        assert_eq!(answer.summary, "inner {braces}");
    }

    #[test]
    fn test_invalid_json() {
        let result: Result<Answer> = parse_structured("no json here");
        assert!(matches!(result, Err(Error::LLMError(_))));
    }

    #[test]
    fn test_format_instructions_include_shape() {
        assert!(Answer::format_instructions().contains(r#""summary""#));
    }
}
