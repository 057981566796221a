use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::engine::scoring::ScoreBreakdown;

use super::{AnswerOption, QuestionPublic};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptKind {
    Full,
    Daily,
}

impl AttemptKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptKind::Full => "full",
            AttemptKind::Daily => "daily",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Submitted,
}

/// Stored answer for one question of an attempt. Re-answering overwrites the
/// selection but keeps the original `answered_at` so the audit ordering used
/// by stats is preserved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub selected_option: AnswerOption,
    pub is_correct: bool,
    pub time_taken_seconds: Option<u32>,
    pub answered_at: DateTime<Utc>,
}

/// One test instance for one user. `question_ids` is frozen at creation;
/// composition never changes after generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestAttempt {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub kind: AttemptKind,
    /// Calendar date of the shared assignment, only set for daily attempts.
    pub daily_date: Option<String>,
    pub question_ids: Vec<String>,
    pub answers: HashMap<String, AnswerRecord>,
    pub status: AttemptStatus,
    pub result: Option<ScoreBreakdown>,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// The shared question set for one calendar date. `test_date` carries a
/// unique index: all users racing into a fresh date converge on one row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyTest {
    #[serde(rename = "_id")]
    pub id: String,
    pub test_date: String,
    pub question_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct StartTestRequest {
    /// Paper size; defaults to the standard 100-question full test.
    pub total_questions: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct TestStartResponse {
    pub attempt_id: String,
    pub total_questions: u32,
    pub questions: Vec<QuestionPublic>,
}

#[derive(Debug, Deserialize)]
pub struct TestAnswerRequest {
    pub attempt_id: String,
    pub question_id: String,
    pub selected_option: AnswerOption,
    pub time_taken_seconds: Option<u32>,
}

/// Acknowledgement only: tests reveal correctness at submit, not per answer.
#[derive(Debug, Serialize)]
pub struct TestAnswerAck {
    pub attempt_id: String,
    pub question_id: String,
    pub selected_option: AnswerOption,
    pub answered_count: u32,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub attempt_id: String,
    pub kind: AttemptKind,
    #[serde(flatten)]
    pub breakdown: ScoreBreakdown,
}

#[derive(Debug, Serialize)]
pub struct AttemptHistoryEntry {
    pub attempt_id: String,
    pub kind: AttemptKind,
    pub total_questions: u32,
    pub status: AttemptStatus,
    pub final_score: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct DailyStartResponse {
    pub attempt_id: String,
    pub test_date: String,
    pub status: AttemptStatus,
    pub total_questions: u32,
    pub questions: Vec<QuestionPublic>,
}
