use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AnswerOption, QuestionPublic};

/// Flashcard drill state for one user and one deck.
///
/// `pending` is the ordered retry queue: the head is the question currently
/// being served, wrong answers rotate to the tail, correct answers move to
/// `retired`. The session is terminal once `pending` is empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterySession {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub deck_id: String,
    pub pending: Vec<String>,
    pub retired: Vec<String>,
    pub total_questions: u32,
    pub completed: bool,
    /// Bumped on every accepted answer. Conditional updates pin it, so two
    /// racing answers can never both land on the same queue state.
    #[serde(default)]
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl MasterySession {
    /// Head of the retry queue, if any. Reading never advances the queue.
    pub fn current_question_id(&self) -> Option<&str> {
        self.pending.first().map(String::as_str)
    }
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: String,
    pub deck_id: String,
    pub total_questions: u32,
    pub pending_count: u32,
}

#[derive(Debug, Serialize)]
pub struct NextFlashcardResponse {
    pub session_id: String,
    pub question: Option<QuestionPublic>,
    pub pending_count: u32,
    pub completed: bool,
}

/// Append-only audit row, one per graded flashcard. Stats read these in
/// `answered_at` order; nothing ever updates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashcardAnswerLog {
    #[serde(rename = "_id")]
    pub id: String,
    pub session_id: String,
    pub user_id: String,
    pub question_id: String,
    pub selected_option: AnswerOption,
    pub is_correct: bool,
    pub time_taken_seconds: Option<u32>,
    pub answered_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct FlashcardAnswerRequest {
    pub session_id: String,
    pub question_id: String,
    pub selected_option: AnswerOption,
    pub time_taken_seconds: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct FlashcardAnswerResult {
    pub is_correct: bool,
    pub correct_option: AnswerOption,
    pub selected_option: AnswerOption,
    pub explanation: String,
    pub pending_count: u32,
    pub completed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(pending: &[&str]) -> MasterySession {
        MasterySession {
            id: "s1".to_string(),
            user_id: "u1".to_string(),
            deck_id: "d1".to_string(),
            pending: pending.iter().map(|s| s.to_string()).collect(),
            retired: Vec::new(),
            total_questions: pending.len() as u32,
            completed: false,
            version: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn repeated_peeks_return_the_same_head() {
        let session = session(&["q1", "q2"]);
        assert_eq!(session.current_question_id(), Some("q1"));
        assert_eq!(session.current_question_id(), Some("q1"));
        assert_eq!(session.pending, vec!["q1", "q2"]);
    }

    #[test]
    fn exhausted_queue_has_no_current_question() {
        let mut exhausted = session(&[]);
        exhausted.completed = true;
        assert_eq!(exhausted.current_question_id(), None);
    }

    #[test]
    fn stored_sessions_without_a_version_deserialize_at_zero() {
        let doc = mongodb::bson::doc! {
            "_id": "s1",
            "user_id": "u1",
            "deck_id": "d1",
            "pending": ["q1"],
            "retired": [],
            "total_questions": 1,
            "completed": false,
            "created_at": mongodb::bson::to_bson(&Utc::now()).unwrap(),
        };
        let session: MasterySession = mongodb::bson::from_document(doc).unwrap();
        assert_eq!(session.version, 0);
    }
}
