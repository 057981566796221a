use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

pub const ROLE_USER: &str = "user";
pub const ROLE_ADMIN: &str = "admin";

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupTally {
    pub attempted: u32,
    pub correct: u32,
}

/// Running per-user aggregates, one document per user, `$inc`-upserted as
/// answers land and sessions/attempts finalize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStatsDoc {
    #[serde(rename = "_id")]
    pub user_id: String,
    #[serde(default)]
    pub flashcard_sessions_started: u32,
    #[serde(default)]
    pub flashcard_sessions_completed: u32,
    #[serde(default)]
    pub full_tests_started: u32,
    #[serde(default)]
    pub full_tests_submitted: u32,
    #[serde(default)]
    pub daily_tests_started: u32,
    #[serde(default)]
    pub daily_tests_submitted: u32,
    #[serde(default)]
    pub answers_total: u32,
    #[serde(default)]
    pub answers_correct: u32,
    #[serde(default)]
    pub chapters: BTreeMap<String, GroupTally>,
    #[serde(default)]
    pub categories: BTreeMap<String, GroupTally>,
}

impl UserStatsDoc {
    pub fn empty(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            flashcard_sessions_started: 0,
            flashcard_sessions_completed: 0,
            full_tests_started: 0,
            full_tests_submitted: 0,
            daily_tests_started: 0,
            daily_tests_submitted: 0,
            answers_total: 0,
            answers_correct: 0,
            chapters: BTreeMap::new(),
            categories: BTreeMap::new(),
        }
    }

    pub fn accuracy(&self) -> Option<f64> {
        if self.answers_total == 0 {
            None
        } else {
            Some(f64::from(self.answers_correct) / f64::from(self.answers_total))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserStatsResponse {
    pub user_id: String,
    pub flashcard_sessions_started: u32,
    pub flashcard_sessions_completed: u32,
    pub full_tests_started: u32,
    pub full_tests_submitted: u32,
    pub daily_tests_started: u32,
    pub daily_tests_submitted: u32,
    pub answers_total: u32,
    pub answers_correct: u32,
    pub accuracy: Option<f64>,
    pub chapters: BTreeMap<String, GroupTally>,
    pub categories: BTreeMap<String, GroupTally>,
}

impl From<UserStatsDoc> for UserStatsResponse {
    fn from(doc: UserStatsDoc) -> Self {
        let accuracy = doc.accuracy();
        Self {
            user_id: doc.user_id,
            flashcard_sessions_started: doc.flashcard_sessions_started,
            flashcard_sessions_completed: doc.flashcard_sessions_completed,
            full_tests_started: doc.full_tests_started,
            full_tests_submitted: doc.full_tests_submitted,
            daily_tests_started: doc.daily_tests_started,
            daily_tests_submitted: doc.daily_tests_submitted,
            answers_total: doc.answers_total,
            answers_correct: doc.answers_correct,
            accuracy,
            chapters: doc.chapters,
            categories: doc.categories,
        }
    }
}
