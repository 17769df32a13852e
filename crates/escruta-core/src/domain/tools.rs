//! Structured study material produced by generation jobs and summaries

use serde::{Deserialize, Serialize};

use crate::llm::StructuredOutput;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyConcept {
    pub term: String,
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyGuide {
    pub overview: String,
    #[serde(default)]
    pub key_concepts: Vec<KeyConcept>,
    #[serde(default)]
    pub important_details: Vec<String>,
    #[serde(default)]
    pub connections: Vec<String>,
    #[serde(default)]
    pub review_questions: Vec<String>,
}

impl StructuredOutput for StudyGuide {
    fn json_shape() -> &'static str {
        r#"{
  "overview": "string",
  "keyConcepts": [{"term": "string", "definition": "string"}],
  "importantDetails": ["string"],
  "connections": ["string"],
  "reviewQuestions": ["string"]
}"#
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcards {
    pub flashcards: Vec<Flashcard>,
}

impl StructuredOutput for Flashcards {
    fn json_shape() -> &'static str {
        r#"{"flashcards": [{"front": "string", "back": "string"}]}"#
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// "multiple_choice", "true_false" or "short_answer"
    #[serde(rename = "type")]
    pub kind: String,
    pub question: String,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub correct_answer_index: Option<i32>,
    #[serde(default)]
    pub correct_answer_boolean: Option<bool>,
    #[serde(default)]
    pub sample_answer: Option<String>,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Questionnaire {
    pub title: String,
    pub questions: Vec<Question>,
}

impl StructuredOutput for Questionnaire {
    fn json_shape() -> &'static str {
        r#"{
  "title": "string",
  "questions": [{
    "type": "multiple_choice | true_false | short_answer",
    "question": "string",
    "options": ["string"] or null,
    "correctAnswerIndex": 0 or null,
    "correctAnswerBoolean": true or null,
    "sampleAnswer": "string" or null,
    "explanation": "string"
  }]
}"#
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub label: String,
    #[serde(default)]
    pub children: Vec<Branch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MindMap {
    pub central: String,
    pub branches: Vec<Branch>,
}

impl StructuredOutput for MindMap {
    fn json_shape() -> &'static str {
        r#"{
  "central": "string",
  "branches": [{"label": "string", "children": [{"label": "string", "children": []}]}]
}"#
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub summary: String,
}

impl StructuredOutput for SummaryResponse {
    fn json_shape() -> &'static str {
        r#"{"summary": "string"}"#
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExampleQuestions {
    #[serde(default)]
    pub questions: Vec<String>,
}

impl ExampleQuestions {
    /// Keep at most `limit` non-blank questions
    pub fn limited(self, limit: usize) -> Self {
        Self {
            questions: self
                .questions
                .into_iter()
                .filter(|q| !q.trim().is_empty())
                .take(limit)
                .collect(),
        }
    }
}

impl StructuredOutput for ExampleQuestions {
    fn json_shape() -> &'static str {
        r#"{"questions": ["string", "string", "string"]}"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::parse_structured;

    #[test]
    fn test_mind_map_is_recursive() {
        let raw = r#"{
            "central": "Rust",
            "branches": [
                {"label": "Ownership", "children": [{"label": "Borrowing"}]},
                {"label": "Traits"}
            ]
        }"#;
        let map: MindMap = parse_structured(raw).unwrap();
        assert_eq!(map.branches[0].children[0].label, "Borrowing");
        assert!(map.branches[1].children.is_empty());
    }

    #[test]
    fn test_questionnaire_uses_camel_case() {
        let raw = r#"{"title": "Quiz", "questions": [{
            "type": "true_false", "question": "Rust has a GC?",
            "options": null, "correctAnswerIndex": null,
            "correctAnswerBoolean": false, "sampleAnswer": null,
            "explanation": "Ownership replaces garbage collection."
        }]}"#;
        let quiz: Questionnaire = parse_structured(raw).unwrap();
        assert_eq!(quiz.questions[0].correct_answer_boolean, Some(false));

        let json = serde_json::to_value(&quiz).unwrap();
        assert_eq!(json["questions"][0]["type"], "true_false");
        assert!(json["questions"][0].get("correctAnswerBoolean").is_some());
    }

    #[test]
    fn test_example_questions_filtered_and_limited() {
        let questions = ExampleQuestions {
            questions: vec![
                "What is ownership?".into(),
                "  ".into(),
                "What is a trait?".into(),
                "What is a lifetime?".into(),
                "What is a macro?".into(),
            ],
        }
        .limited(3);

        assert_eq!(
            questions.questions,
            vec!["What is ownership?", "What is a trait?", "What is a lifetime?"]
        );
    }

    #[test]
    fn test_study_guide_tolerates_missing_lists() {
        let guide: StudyGuide = parse_structured(r#"{"overview": "Intro"}"#).unwrap();
        assert!(guide.key_concepts.is_empty());
    }
}
