use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::AnswerOption;

/// A single multiple-choice question. Immutable once imported: corrections
/// ship as a fresh deck, never as an edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "_id")]
    pub id: String,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_option: AnswerOption,
    pub explanation: String,
    pub chapter: String,
    pub category: String,
    pub difficulty: i32,
    pub deck_id: String,
    pub created_at: DateTime<Utc>,
}

impl Question {
    pub fn option_text(&self, option: AnswerOption) -> &str {
        match option {
            AnswerOption::A => &self.option_a,
            AnswerOption::B => &self.option_b,
            AnswerOption::C => &self.option_c,
            AnswerOption::D => &self.option_d,
        }
    }
}

/// Named grouping of questions created by a CSV import. Every import creates
/// fresh decks; re-uploading a name never alters an existing deck.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deck {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub question_count: u32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Per-user "seen" marker behind the deck "new" badge.
/// Unique on (deck_id, user_id); mark-viewed upserts are no-ops after the first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckView {
    #[serde(rename = "_id")]
    pub id: String,
    pub deck_id: String,
    pub user_id: String,
    pub viewed_at: DateTime<Utc>,
}

/// Question shape served to clients: never carries the correct option
/// or the explanation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionPublic {
    pub id: String,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub chapter: String,
    pub category: String,
    pub difficulty: i32,
}

impl From<&Question> for QuestionPublic {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id.clone(),
            question_text: q.question_text.clone(),
            option_a: q.option_a.clone(),
            option_b: q.option_b.clone(),
            option_c: q.option_c.clone(),
            option_d: q.option_d.clone(),
            chapter: q.chapter.clone(),
            category: q.category.clone(),
            difficulty: q.difficulty,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeckSummary {
    pub id: String,
    pub name: String,
    pub question_count: u32,
    pub is_new: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct DeckDetailResponse {
    pub id: String,
    pub name: String,
    pub question_count: u32,
    pub created_at: DateTime<Utc>,
    pub questions: Vec<QuestionPublic>,
}

#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub decks_created: u32,
    pub questions_imported: u32,
    pub deck_names: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BankStats {
    pub total_questions: u64,
    pub total_decks: u64,
    pub by_chapter: BTreeMap<String, u64>,
    pub by_category: BTreeMap<String, u64>,
}
