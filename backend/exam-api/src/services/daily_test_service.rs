use chrono::{NaiveDate, Utc};
use mongodb::bson::doc;
use mongodb::{Collection, Database};
use std::collections::HashMap;
use uuid::Uuid;

use crate::config::ChapterWeight;
use crate::engine::daily::{pick_daily_questions, DailyPool};
use crate::error::{EngineError, EngineResult};
use crate::metrics::{DAILY_ASSIGNMENTS_TOTAL, TEST_ATTEMPTS_TOTAL};
use crate::models::{
    AttemptKind, AttemptStatus, DailyStartResponse, DailyTest, QuestionPublic, TestAttempt,
};
use crate::services::stats_service::StatsService;
use crate::services::test_service::{chapter_id_pools, ordered_questions};
use crate::services::is_duplicate_key;

pub struct DailyTestService {
    db: Database,
    weights: Vec<ChapterWeight>,
}

impl DailyTestService {
    pub fn new(db: Database, weights: Vec<ChapterWeight>) -> Self {
        Self { db, weights }
    }

    fn daily_tests(&self) -> Collection<DailyTest> {
        self.db.collection::<DailyTest>("daily_tests")
    }

    fn attempts(&self) -> Collection<TestAttempt> {
        self.db.collection::<TestAttempt>("test_attempts")
    }

    /// Starts (or resumes) today's daily test for a user. The paper itself is
    /// shared: the first caller of the day materializes it, everyone else
    /// receives the same ten questions.
    pub async fn start_today(&self, user_id: &str) -> EngineResult<DailyStartResponse> {
        let date = today();
        let assignment = self.load_or_create_assignment(&date).await?;
        let attempt = self.load_or_create_attempt(user_id, &assignment).await?;

        let questions = ordered_questions(&self.db, &attempt.question_ids).await?;
        Ok(DailyStartResponse {
            attempt_id: attempt.id,
            test_date: date,
            status: attempt.status,
            total_questions: questions.len() as u32,
            questions: questions.iter().map(QuestionPublic::from).collect(),
        })
    }

    /// Returns the user's attempt for a past or current date. Never creates
    /// anything: a date the user did not play is a plain not-found, a future
    /// date is rejected outright.
    pub async fn attempt_for_date(
        &self,
        user_id: &str,
        date: &str,
    ) -> EngineResult<DailyStartResponse> {
        let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| EngineError::Validation(format!("invalid date '{}'", date)))?;
        if parsed > Utc::now().date_naive() {
            return Err(EngineError::Validation(
                "daily tests are not available for future dates".to_string(),
            ));
        }

        let attempt = self
            .attempts()
            .find_one(doc! { "user_id": user_id, "kind": "daily", "daily_date": date })
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("daily attempt for {}", date)))?;

        let questions = ordered_questions(&self.db, &attempt.question_ids).await?;
        Ok(DailyStartResponse {
            attempt_id: attempt.id,
            test_date: date.to_string(),
            status: attempt.status,
            total_questions: questions.len() as u32,
            questions: questions.iter().map(QuestionPublic::from).collect(),
        })
    }

    async fn load_or_create_assignment(&self, date: &str) -> EngineResult<DailyTest> {
        if let Some(existing) = self.daily_tests().find_one(doc! { "test_date": date }).await? {
            return Ok(existing);
        }

        let per_chapter = chapter_id_pools(&self.db, &self.weights).await?;
        let pools: Vec<DailyPool> = per_chapter
            .into_iter()
            .map(|(weight, question_ids)| DailyPool {
                chapter: weight.chapter,
                weight: weight.weight,
                question_ids,
            })
            .collect();
        let question_ids = pick_daily_questions(date, &pools)?;

        let assignment = DailyTest {
            id: Uuid::new_v4().to_string(),
            test_date: date.to_string(),
            question_ids,
            created_at: Utc::now(),
        };
        match self.daily_tests().insert_one(&assignment).await {
            Ok(_) => {
                DAILY_ASSIGNMENTS_TOTAL.inc();
                tracing::info!("Daily test generated for {}", date);
                Ok(assignment)
            }
            // Lost the creation race; the winner's paper is the paper.
            Err(e) if is_duplicate_key(&e) => self
                .daily_tests()
                .find_one(doc! { "test_date": date })
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("daily test for {}", date))),
            Err(e) => Err(e.into()),
        }
    }

    async fn load_or_create_attempt(
        &self,
        user_id: &str,
        assignment: &DailyTest,
    ) -> EngineResult<TestAttempt> {
        let filter = doc! {
            "user_id": user_id,
            "kind": "daily",
            "daily_date": &assignment.test_date,
        };
        if let Some(existing) = self.attempts().find_one(filter.clone()).await? {
            return Ok(existing);
        }

        let attempt = TestAttempt {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            kind: AttemptKind::Daily,
            daily_date: Some(assignment.test_date.clone()),
            question_ids: assignment.question_ids.clone(),
            answers: HashMap::new(),
            status: AttemptStatus::InProgress,
            result: None,
            created_at: Utc::now(),
            submitted_at: None,
        };
        match self.attempts().insert_one(&attempt).await {
            Ok(_) => {
                TEST_ATTEMPTS_TOTAL
                    .with_label_values(&["daily", "started"])
                    .inc();
                StatsService::new(self.db.clone())
                    .record_test_started(user_id, AttemptKind::Daily)
                    .await?;
                tracing::info!(
                    "Daily attempt started: {} for user {} ({})",
                    attempt.id,
                    user_id,
                    assignment.test_date
                );
                Ok(attempt)
            }
            // Double-clicked start; reuse the attempt that won.
            Err(e) if is_duplicate_key(&e) => self
                .attempts()
                .find_one(filter)
                .await?
                .ok_or_else(|| {
                    EngineError::NotFound(format!(
                        "daily attempt for {}",
                        assignment.test_date
                    ))
                }),
            Err(e) => Err(e.into()),
        }
    }
}

fn today() -> String {
    Utc::now().date_naive().format("%Y-%m-%d").to_string()
}
