/**
 * Quiz documents and their validation.
 *
 * A quiz document is stored as JSON:
 *
 * ```text
 * {"title": "...", "questions": [{"question": "...", "options": ["...", "..."],
 *                                 "correctAnswer": 0}]}
 * ```
 *
 * Documents are validated in full when they are loaded or uploaded, so a session
 * never sees an inconsistent answer key.
 */
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::common::{McqError, Result};


/// Represents an entire quiz, e.g. one week of a course.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct QuizDocument {
    pub title: String,
    pub questions: Vec<Question>,
}


/// Represents a multiple-choice question.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Question {
    #[serde(rename = "question")]
    pub text: String,
    pub options: Vec<String>,
    /// Index into `options` of the right answer.
    #[serde(rename = "correctAnswer")]
    pub correct_index: usize,
}


impl QuizDocument {
    /// Parse and validate a quiz document.
    pub fn from_json(data: &str) -> Result<QuizDocument> {
        let value: Value = serde_json::from_str(data).map_err(McqError::Json)?;
        QuizDocument::from_value(&value)
    }

    /// Validate an arbitrary JSON value as a quiz document. Every violation is
    /// reported, not just the first.
    pub fn from_value(value: &Value) -> Result<QuizDocument> {
        let object = value.as_object().ok_or_else(|| {
            McqError::InvalidQuizFormat(vec![String::from("quiz must be a JSON object")])
        })?;

        let mut violations = Vec::new();
        let title = match object.get("title").and_then(Value::as_str) {
            Some(title) if !title.trim().is_empty() => title.to_string(),
            _ => {
                violations.push(String::from("missing title"));
                String::new()
            },
        };

        let raw_questions: &[Value] = match object.get("questions").and_then(Value::as_array) {
            Some(questions) => questions.as_slice(),
            None => {
                violations.push(String::from("missing questions array"));
                &[]
            },
        };

        let mut questions = Vec::with_capacity(raw_questions.len());
        for (i, raw) in raw_questions.iter().enumerate() {
            let number = i + 1;
            let text = raw.get("question").and_then(Value::as_str).unwrap_or("");

            let raw_options = raw.get("options").and_then(Value::as_array);
            let mut options = Vec::new();
            if let Some(raw_options) = raw_options {
                for option in raw_options.iter() {
                    match option.as_str() {
                        Some(option) => options.push(option.to_string()),
                        None => {
                            violations.push(
                                format!("question #{} has an option that is not text", number)
                            );
                            break;
                        },
                    }
                }
            }

            let correct = raw.get("correctAnswer").and_then(Value::as_i64);
            let problems = question_violations(number, text, options.len(), correct);
            if problems.is_empty() {
                if let Some(correct) = correct {
                    questions.push(Question {
                        text: text.to_string(),
                        options,
                        correct_index: correct as usize,
                    });
                }
            }
            violations.extend(problems);
        }

        if !violations.is_empty() {
            return Err(McqError::InvalidQuizFormat(violations));
        }
        if questions.is_empty() {
            return Err(McqError::EmptyQuiz);
        }
        Ok(QuizDocument { title, questions })
    }

    /// Check an already-typed document against the same rules as `from_value`.
    pub fn validate(&self) -> Result<()> {
        let mut violations = Vec::new();
        if self.title.trim().is_empty() {
            violations.push(String::from("missing title"));
        }
        for (i, q) in self.questions.iter().enumerate() {
            violations.extend(
                question_violations(i + 1, &q.text, q.options.len(), Some(q.correct_index as i64))
            );
        }

        if !violations.is_empty() {
            Err(McqError::InvalidQuizFormat(violations))
        } else if self.questions.is_empty() {
            Err(McqError::EmptyQuiz)
        } else {
            Ok(())
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(McqError::Json)
    }
}


/// The problems with question number `number` (one-based, as shown to users).
fn question_violations(
    number: usize, text: &str, option_count: usize, correct: Option<i64>
) -> Vec<String> {
    let mut violations = Vec::new();
    if text.trim().is_empty() {
        violations.push(format!("question #{} is missing its text", number));
    }
    if option_count < 2 {
        violations.push(format!("question #{} needs at least two options", number));
    }
    match correct {
        Some(correct) if correct >= 0 && (correct as usize) < option_count => {},
        Some(_) => {
            violations.push(
                format!("question #{} has an invalid correctAnswer index", number)
            );
        },
        None => {
            violations.push(format!("question #{} is missing correctAnswer", number));
        },
    }
    violations
}
