//! Quiz state consumed by the cart
//!
//! The quiz flow itself lives elsewhere; the cart only reads what it
//! persisted: the shopper's answers for the order note and audience, and the
//! completion flag gating direct upsell adds.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::{cart::gifts::Audience, products::Product};

/// Storage key of the in-progress quiz state.
pub const QUIZ_PROGRESS_KEY: &str = "quiz_progress";

/// Storage key of the finished quiz results.
pub const QUIZ_RESULTS_KEY: &str = "quiz_results";

/// Storage key of the completion flag.
pub const QUIZ_COMPLETED_KEY: &str = "quiz_completed";

/// Where shoppers are sent to take the quiz.
pub const DEFAULT_QUIZ_URL: &str = "/pages/get-your-formula";

/// Note position of answers that do not specify one.
pub const DEFAULT_NOTE_POSITION: i64 = 10;

const GENDER_QUESTION: &str = "gender";

/// One selected answer option.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerChoice {
    /// Machine value of the option
    #[serde(default)]
    pub value: Option<String>,

    /// Display title, or the joined fields of a free-text answer
    #[serde(default)]
    pub title: Option<String>,

    /// `free_text` for free-text answers
    #[serde(default, rename = "type")]
    pub kind: Option<String>,

    /// Formulation codes attached to the option
    #[serde(default)]
    pub formulations: Vec<String>,

    /// Position of the question in the order note
    #[serde(default)]
    pub order_note_position: Option<i64>,
}

/// The answer to one question.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    /// Multiple-choice answer
    Multiple(Vec<AnswerChoice>),

    /// Single-choice or free-text answer
    Single(AnswerChoice),
}

impl Answer {
    /// Position of the question in the order note.
    pub fn note_position(&self) -> i64 {
        match self {
            Self::Single(choice) => choice.order_note_position,
            Self::Multiple(_) => None,
        }
        .unwrap_or(DEFAULT_NOTE_POSITION)
    }

    /// Selected options.
    pub fn choices(&self) -> &[AnswerChoice] {
        match self {
            Self::Single(choice) => std::slice::from_ref(choice),
            Self::Multiple(choices) => choices,
        }
    }

    /// Machine value of a single-choice answer.
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Single(choice) => choice.value.as_deref(),
            Self::Multiple(_) => None,
        }
    }
}

/// The `quiz_results` blob.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResults {
    /// Free-form intro fields, such as the shopper's name
    #[serde(default)]
    pub intro_data: BTreeMap<String, Value>,

    /// Answers keyed by question id
    #[serde(default)]
    pub answers: BTreeMap<String, Answer>,

    /// Calculated hair porosity
    #[serde(default)]
    pub calculated_porosity: Option<String>,

    /// Calculated hair elasticity
    #[serde(default)]
    pub calculated_elasticity: Option<String>,

    /// Hair treatment formulation
    #[serde(default)]
    pub formulation_hair_treatment: Option<String>,

    /// Elixir formulation
    #[serde(default)]
    pub formulation_elixir: Option<String>,

    /// Conditioner formulation
    #[serde(default)]
    pub formulation_conditioner: Option<String>,

    /// When the results were saved
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl QuizResults {
    /// Parse the stored JSON blob.
    ///
    /// # Errors
    ///
    /// Returns the JSON error when the blob is not a quiz results object.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Gift audience derived from the gender answer.
    pub fn audience(&self) -> Audience {
        Audience::from_gender_answer(self.answers.get(GENDER_QUESTION).and_then(Answer::value))
    }

    /// Intro fields as text, in key order. Non-string values are rendered as JSON.
    pub fn intro_fields(&self) -> impl Iterator<Item = (&str, String)> {
        self.intro_data.iter().map(|(key, value)| {
            let text = match value {
                Value::Null => String::new(),
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };

            (key.as_str(), text)
        })
    }

    /// Answers ordered by note position; equal positions keep key order.
    pub fn answers_by_position(&self) -> Vec<(&str, &Answer)> {
        let mut answers: Vec<(&str, &Answer)> = self
            .answers
            .iter()
            .map(|(question, answer)| (question.as_str(), answer))
            .collect();

        answers.sort_by_key(|(_, answer)| answer.note_position());

        answers
    }
}

/// Whether the stored completion flag marks the quiz as completed.
pub fn quiz_completed(flag: Option<&str>) -> bool {
    flag == Some("true")
}

/// What happens when a shopper adds an upsell product from the cart drawer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsellAction {
    /// Add the product straight to the cart
    AddToCart,

    /// Send the shopper to the quiz first
    RedirectToQuiz(String),
}

/// Products tagged `no consult` can always be added; others need a completed quiz.
pub fn upsell_action(product: &Product, quiz_completed: bool, quiz_url: Option<&str>) -> UpsellAction {
    if quiz_completed || product.has_tag("no consult") || product.has_tag("no-consult") {
        UpsellAction::AddToCart
    } else {
        UpsellAction::RedirectToQuiz(quiz_url.unwrap_or(DEFAULT_QUIZ_URL).to_string())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use testresult::TestResult;

    use crate::products::{ProductId, Variant, VariantId};

    use super::*;

    fn results() -> Result<QuizResults, serde_json::Error> {
        serde_json::from_value(json!({
            "introData": { "name": "Ada", "age": 34 },
            "answers": {
                "gender": { "value": "male", "title": "Male", "orderNotePosition": 1 },
                "concerns": [
                    { "value": "frizz", "title": "Frizz", "formulations": ["F1"] },
                    { "value": "dry", "title": "Dryness", "formulations": [] }
                ],
                "goals": { "type": "free_text", "title": "Shine", "orderNotePosition": 2 }
            },
            "calculatedPorosity": "High",
            "timestamp": "2025-01-01T00:00:00Z"
        }))
    }

    #[test]
    fn parses_single_multiple_and_free_text_answers() -> TestResult {
        let results = results()?;

        assert_eq!(results.answers.len(), 3);
        assert!(matches!(results.answers.get("concerns"), Some(Answer::Multiple(choices)) if choices.len() == 2));
        assert_eq!(results.calculated_porosity.as_deref(), Some("High"));

        Ok(())
    }

    #[test]
    fn audience_follows_gender_answer() -> TestResult {
        assert_eq!(results()?.audience(), Audience::Male);
        assert_eq!(QuizResults::default().audience(), Audience::Female);

        Ok(())
    }

    #[test]
    fn answers_sort_by_position_with_default_ten() -> TestResult {
        let results = results()?;

        let order: Vec<&str> = results
            .answers_by_position()
            .into_iter()
            .map(|(question, _)| question)
            .collect();

        assert_eq!(order, vec!["gender", "goals", "concerns"]);

        Ok(())
    }

    #[test]
    fn intro_fields_render_non_strings() -> TestResult {
        let results = results()?;

        let fields: Vec<(&str, String)> = results.intro_fields().collect();

        assert_eq!(
            fields,
            vec![("age", "34".to_string()), ("name", "Ada".to_string())]
        );

        Ok(())
    }

    #[test]
    fn completion_flag_must_be_true() {
        assert!(quiz_completed(Some("true")));
        assert!(!quiz_completed(Some("false")));
        assert!(!quiz_completed(None));
    }

    #[test]
    fn upsell_gate_requires_tag_or_completed_quiz() -> TestResult {
        let plain = Product::new(
            ProductId(1),
            "Serum",
            "serum",
            vec![Variant::new(VariantId(1), "", 1000)],
        )?;
        let no_consult = plain.clone().with_tags(vec!["No-Consult".to_string()]);

        assert_eq!(
            upsell_action(&plain, false, None),
            UpsellAction::RedirectToQuiz(DEFAULT_QUIZ_URL.to_string())
        );
        assert_eq!(upsell_action(&plain, true, None), UpsellAction::AddToCart);
        assert_eq!(upsell_action(&no_consult, false, None), UpsellAction::AddToCart);

        Ok(())
    }
}
