//! Order note
//!
//! A plain-text summary of the shopper's quiz results attached to the remote
//! cart, so fulfilment sees the formulation alongside the order.

use tracing::warn;

use crate::quiz::QuizResults;

/// Default cap on note length, below the storefront's own limit.
pub const DEFAULT_NOTE_LIMIT: usize = 4900;

/// Appended to notes cut at the cap.
pub const NOTE_TRUNCATION_MARKER: &str = "\n\n[Note truncated due to length]";

const HEADER: &str = "--- QUIZ RESULTS ---";
const FOOTER: &str = "--- END QUIZ RESULTS ---";

/// A rendered order note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderNote(String);

impl OrderNote {
    /// Build the note from the products whose quantity was doubled for BOGO
    /// and the shopper's quiz results.
    pub fn build(bogo_titles: &[String], quiz: Option<&QuizResults>) -> Self {
        let mut note = String::from(HEADER);
        note.push('\n');

        if !bogo_titles.is_empty() {
            note.push_str("\nBOGO PROMOTION:\n");
            note.push_str("The following products had Buy 1 Get 1 Free applied:\n");

            for title in bogo_titles {
                line(&mut note, &format!("- {}", sanitize(title)));
            }

            note.push_str("(Quantities have been doubled in the cart)\n");
        }

        if let Some(quiz) = quiz {
            write_quiz(&mut note, quiz);
        }

        note.push('\n');
        note.push_str(FOOTER);

        Self(note)
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    /// Whether the note is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The note as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The note cut to `limit` characters plus the truncation marker when it
    /// is longer than `limit`.
    #[must_use]
    pub fn truncated(self, limit: usize) -> Self {
        let length = self.len();

        if length <= limit {
            return self;
        }

        warn!(length, limit, "order note exceeds limit, truncating");

        let mut text: String = self.0.chars().take(limit).collect();
        text.push_str(NOTE_TRUNCATION_MARKER);

        Self(text)
    }

    /// Consume the note.
    pub fn into_string(self) -> String {
        self.0
    }
}

fn write_quiz(note: &mut String, quiz: &QuizResults) {
    let intro: Vec<(String, String)> = quiz
        .intro_fields()
        .map(|(key, value)| (sanitize(key), sanitize(&value)))
        .filter(|(_, value)| !value.is_empty())
        .collect();

    if !quiz.intro_data.is_empty() {
        note.push_str("\nINTRO DATA:\n");

        for (key, value) in intro {
            line(note, &format!("{key}: {value}"));
        }
    }

    section(
        note,
        "CALCULATED VALUES",
        &[
            ("Porosity", quiz.calculated_porosity.as_deref()),
            ("Elasticity", quiz.calculated_elasticity.as_deref()),
        ],
    );

    section(
        note,
        "FORMULATION VALUES",
        &[
            ("Hair Treatment", quiz.formulation_hair_treatment.as_deref()),
            ("Elixir", quiz.formulation_elixir.as_deref()),
            ("Conditioner", quiz.formulation_conditioner.as_deref()),
        ],
    );

    if quiz.answers.is_empty() {
        return;
    }

    note.push_str("\nQUIZ ANSWERS:\n");

    for (question, answer) in quiz.answers_by_position() {
        let text = answer
            .choices()
            .iter()
            .filter_map(|choice| choice.title.as_deref())
            .map(sanitize)
            .filter(|title| !title.is_empty())
            .collect::<Vec<_>>()
            .join(", ");

        if text.is_empty() {
            continue;
        }

        line(note, &format!("{}: {text}", sanitize(question)));

        for choice in answer.choices() {
            if !choice.formulations.is_empty() {
                line(
                    note,
                    &format!("  - Formulations: {}", choice.formulations.join(", ")),
                );
            }
        }
    }
}

fn section(note: &mut String, heading: &str, values: &[(&str, Option<&str>)]) {
    let present: Vec<(&str, &str)> = values
        .iter()
        .filter_map(|(label, value)| value.filter(|v| !v.is_empty()).map(|v| (*label, v)))
        .collect();

    if present.is_empty() {
        return;
    }

    line(note, &format!("\n{heading}:"));

    for (label, value) in present {
        line(note, &format!("{label}: {}", sanitize(value)));
    }
}

fn line(note: &mut String, text: &str) {
    note.push_str(text);
    note.push('\n');
}

/// Strip control characters, normalise typographic quotes, dashes and
/// ellipses, and trim surrounding whitespace.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '\u{0000}'..='\u{001F}' | '\u{007F}'..='\u{009F}' => {}
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{2013}' | '\u{2014}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            other => out.push(other),
        }
    }

    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn empty_note_has_header_and_footer() {
        let note = OrderNote::build(&[], None);

        assert_eq!(note.as_str(), "--- QUIZ RESULTS ---\n\n--- END QUIZ RESULTS ---");
    }

    #[test]
    fn bogo_section_lists_doubled_products() {
        let note = OrderNote::build(&["Repair \u{201C}Mask\u{201D}".to_string()], None);

        assert!(note.as_str().contains(
            "\nBOGO PROMOTION:\nThe following products had Buy 1 Get 1 Free applied:\n- Repair \"Mask\"\n(Quantities have been doubled in the cart)\n"
        ));
    }

    #[test]
    fn quiz_sections_follow_note_layout() -> TestResult {
        let quiz: QuizResults = serde_json::from_value(json!({
            "introData": { "name": "  Ada\u{2026} ", "empty": "" },
            "answers": {
                "concerns": [
                    { "title": "Frizz", "formulations": ["F1", "F2"] },
                    { "title": "Dryness" }
                ],
                "gender": { "value": "female", "title": "Female", "orderNotePosition": 1 }
            },
            "calculatedPorosity": "High",
            "formulationElixir": "E2"
        }))?;

        let note = OrderNote::build(&[], Some(&quiz));

        assert_eq!(
            note.as_str(),
            "--- QUIZ RESULTS ---\n\
             \nINTRO DATA:\nname: Ada...\n\
             \nCALCULATED VALUES:\nPorosity: High\n\
             \nFORMULATION VALUES:\nElixir: E2\n\
             \nQUIZ ANSWERS:\ngender: Female\nconcerns: Frizz, Dryness\n  - Formulations: F1, F2\n\
             \n--- END QUIZ RESULTS ---"
        );

        Ok(())
    }

    #[test]
    fn long_notes_are_truncated_with_marker() {
        let titles: Vec<String> = (0..400).map(|i| format!("Product number {i}")).collect();

        let note = OrderNote::build(&titles, None).truncated(DEFAULT_NOTE_LIMIT);

        assert_eq!(note.len(), DEFAULT_NOTE_LIMIT + NOTE_TRUNCATION_MARKER.chars().count());
        assert!(note.as_str().ends_with(NOTE_TRUNCATION_MARKER));
    }

    #[test]
    fn short_notes_are_left_alone() {
        let note = OrderNote::build(&[], None);

        assert_eq!(note.clone().truncated(DEFAULT_NOTE_LIMIT), note);
    }

    #[test]
    fn sanitize_normalises_typography() {
        assert_eq!(
            sanitize(" \u{2018}Hi\u{2019} \u{2014} there\u{0007}\u{2026} "),
            "'Hi' - there..."
        );
    }
}
