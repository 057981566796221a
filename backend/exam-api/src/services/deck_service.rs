use anyhow::Context;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::UpdateOptions;
use mongodb::{Collection, Database};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::metrics::QUESTIONS_IMPORTED_TOTAL;
use crate::models::{
    AnswerOption, Deck, DeckDetailResponse, DeckSummary, DeckView, ImportSummary, Question,
    QuestionPublic,
};

const EXPECTED_HEADERS: [&str; 11] = [
    "question_text",
    "option_a",
    "option_b",
    "option_c",
    "option_d",
    "correct_option",
    "explanation",
    "chapter",
    "category",
    "difficulty",
    "deck_name",
];

#[derive(Debug, Deserialize)]
struct ImportRow {
    question_text: String,
    option_a: String,
    option_b: String,
    option_c: String,
    option_d: String,
    correct_option: String,
    explanation: String,
    chapter: String,
    category: String,
    difficulty: i32,
    deck_name: String,
}

pub struct DeckService {
    db: Database,
}

impl DeckService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn decks(&self) -> Collection<Deck> {
        self.db.collection::<Deck>("decks")
    }

    fn questions(&self) -> Collection<Question> {
        self.db.collection::<Question>("questions")
    }

    fn deck_views(&self) -> Collection<DeckView> {
        self.db.collection::<DeckView>("deck_views")
    }

    /// Imports a CSV batch of questions. The whole file is validated before
    /// anything is written, so a bad row rejects the entire upload.
    pub async fn import_csv(&self, data: &[u8]) -> EngineResult<ImportSummary> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(data);

        let headers = reader
            .headers()
            .map_err(|e| EngineError::Validation(format!("unreadable CSV header: {}", e)))?
            .clone();
        let got: Vec<&str> = headers.iter().collect();
        if got != EXPECTED_HEADERS {
            return Err(EngineError::Validation(format!(
                "CSV header must be exactly [{}], got [{}]",
                EXPECTED_HEADERS.join(","),
                got.join(",")
            )));
        }

        let mut rows: Vec<(ImportRow, AnswerOption)> = Vec::new();
        for (idx, record) in reader.deserialize::<ImportRow>().enumerate() {
            let row_number = idx + 2; // header is line 1
            let row = record.map_err(|e| {
                EngineError::Validation(format!("row {}: {}", row_number, e))
            })?;
            let correct = validate_row(&row, row_number)?;
            rows.push((row, correct));
        }

        if rows.is_empty() {
            return Err(EngineError::Validation(
                "CSV contains no question rows".to_string(),
            ));
        }

        // Group by deck name, preserving first-seen order for the summary.
        let mut deck_names: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for (row, _) in &rows {
            if seen.insert(row.deck_name.clone()) {
                deck_names.push(row.deck_name.clone());
            }
        }

        // Decks are append-only: every import batch creates fresh decks, even
        // when a name was used before. Corrections ship as a new deck.
        let now = Utc::now();
        let mut deck_ids: BTreeMap<String, String> = BTreeMap::new();
        for name in &deck_names {
            let deck = Deck {
                id: Uuid::new_v4().to_string(),
                name: name.clone(),
                question_count: 0,
                active: true,
                created_at: now,
            };
            self.decks().insert_one(&deck).await?;
            deck_ids.insert(name.clone(), deck.id);
        }
        let decks_created = deck_names.len() as u32;

        let mut per_deck: BTreeMap<String, u32> = BTreeMap::new();
        let questions: Vec<Question> = rows
            .into_iter()
            .map(|(row, correct)| {
                let deck_id = deck_ids[&row.deck_name].clone();
                *per_deck.entry(deck_id.clone()).or_default() += 1;
                Question {
                    id: Uuid::new_v4().to_string(),
                    question_text: row.question_text,
                    option_a: row.option_a,
                    option_b: row.option_b,
                    option_c: row.option_c,
                    option_d: row.option_d,
                    correct_option: correct,
                    explanation: row.explanation,
                    chapter: row.chapter,
                    category: row.category,
                    difficulty: row.difficulty,
                    deck_id,
                    created_at: now,
                }
            })
            .collect();

        self.questions().insert_many(&questions).await?;
        for (deck_id, count) in &per_deck {
            self.decks()
                .update_one(
                    doc! { "_id": deck_id },
                    doc! { "$inc": { "question_count": i64::from(*count) } },
                )
                .await?;
        }

        QUESTIONS_IMPORTED_TOTAL.inc_by(questions.len() as u64);
        tracing::info!(
            "Imported {} questions into {} decks ({} new)",
            questions.len(),
            deck_names.len(),
            decks_created
        );

        Ok(ImportSummary {
            decks_created,
            questions_imported: questions.len() as u32,
            deck_names,
        })
    }

    /// Lists active decks, newest first, with a per-user `is_new` badge:
    /// true until the user explicitly marks the deck viewed.
    pub async fn list_decks(&self, user_id: &str) -> EngineResult<Vec<DeckSummary>> {
        let decks: Vec<Deck> = self
            .decks()
            .find(doc! { "active": true })
            .sort(doc! { "created_at": -1, "_id": -1 })
            .await?
            .try_collect()
            .await?;

        let viewed: HashSet<String> = self
            .deck_views()
            .find(doc! { "user_id": user_id })
            .await?
            .try_collect::<Vec<DeckView>>()
            .await?
            .into_iter()
            .map(|v| v.deck_id)
            .collect();

        Ok(decks
            .into_iter()
            .map(|deck| {
                let is_new = !viewed.contains(&deck.id);
                DeckSummary {
                    id: deck.id,
                    name: deck.name,
                    question_count: deck.question_count,
                    is_new,
                    created_at: deck.created_at,
                }
            })
            .collect())
    }

    /// Returns a deck with its questions, answers hidden. Viewing does not
    /// touch the `is_new` badge; that takes an explicit mark-viewed call.
    pub async fn deck_detail(&self, deck_id: &str) -> EngineResult<DeckDetailResponse> {
        let deck = self
            .decks()
            .find_one(doc! { "_id": deck_id, "active": true })
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("deck {}", deck_id)))?;

        let questions: Vec<Question> = self
            .questions()
            .find(doc! { "deck_id": deck_id })
            .sort(doc! { "_id": 1 })
            .await?
            .try_collect()
            .await?;

        Ok(DeckDetailResponse {
            id: deck.id,
            name: deck.name,
            question_count: deck.question_count,
            created_at: deck.created_at,
            questions: questions.iter().map(QuestionPublic::from).collect(),
        })
    }

    /// Clears the user's `is_new` badge for a deck. Idempotent: the unique
    /// (deck_id, user_id) index makes repeat calls no-ops.
    pub async fn mark_viewed(&self, deck_id: &str, user_id: &str) -> EngineResult<()> {
        let deck = self
            .decks()
            .find_one(doc! { "_id": deck_id, "active": true })
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("deck {}", deck_id)))?;

        let viewed_at =
            mongodb::bson::to_bson(&Utc::now()).context("Failed to serialize timestamp")?;
        self.deck_views()
            .update_one(
                doc! { "deck_id": &deck.id, "user_id": user_id },
                doc! { "$setOnInsert": {
                    "_id": Uuid::new_v4().to_string(),
                    "deck_id": &deck.id,
                    "user_id": user_id,
                    "viewed_at": viewed_at,
                } },
            )
            .with_options(UpdateOptions::builder().upsert(true).build())
            .await?;
        Ok(())
    }
}

fn validate_row(row: &ImportRow, row_number: usize) -> EngineResult<AnswerOption> {
    let required = [
        ("question_text", &row.question_text),
        ("option_a", &row.option_a),
        ("option_b", &row.option_b),
        ("option_c", &row.option_c),
        ("option_d", &row.option_d),
        ("chapter", &row.chapter),
        ("category", &row.category),
        ("deck_name", &row.deck_name),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(EngineError::Validation(format!(
                "row {}: {} must not be empty",
                row_number, field
            )));
        }
    }

    if !(1..=5).contains(&row.difficulty) {
        return Err(EngineError::Validation(format!(
            "row {}: difficulty must be between 1 and 5, got {}",
            row_number, row.difficulty
        )));
    }

    row.correct_option.parse::<AnswerOption>().map_err(|_| {
        EngineError::Validation(format!(
            "row {}: correct_option must be one of A, B, C, D, got '{}'",
            row_number, row.correct_option
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(correct: &str, difficulty: i32) -> ImportRow {
        ImportRow {
            question_text: "What is the pH of water?".to_string(),
            option_a: "5".to_string(),
            option_b: "7".to_string(),
            option_c: "9".to_string(),
            option_d: "11".to_string(),
            correct_option: correct.to_string(),
            explanation: "Pure water is neutral.".to_string(),
            chapter: "Pharmaceutical Chemistry".to_string(),
            category: "technical".to_string(),
            difficulty,
            deck_name: "Chemistry Basics".to_string(),
        }
    }

    #[test]
    fn valid_row_passes() {
        assert_eq!(validate_row(&row("B", 2), 2).unwrap(), AnswerOption::B);
        // Lowercase options are accepted.
        assert_eq!(validate_row(&row("c", 2), 2).unwrap(), AnswerOption::C);
    }

    #[test]
    fn bad_correct_option_is_rejected_with_row_number() {
        let err = validate_row(&row("E", 2), 7).unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert!(err.to_string().contains("row 7"));
    }

    #[test]
    fn difficulty_out_of_range_is_rejected() {
        assert!(validate_row(&row("A", 0), 2).is_err());
        assert!(validate_row(&row("A", 6), 2).is_err());
    }

    #[test]
    fn empty_required_field_is_rejected() {
        let mut bad = row("A", 3);
        bad.chapter = "  ".to_string();
        let err = validate_row(&bad, 4).unwrap_err();
        assert!(err.to_string().contains("chapter"));
    }
}
