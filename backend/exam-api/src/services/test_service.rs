use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::{Collection, Database};
use rand::seq::{IndexedRandom, SliceRandom};
use std::collections::HashMap;
use uuid::Uuid;

use crate::config::ChapterWeight;
use crate::engine::scoring::{self, MarkScheme, QuestionKey};
use crate::engine::weighting::{allocate, ChapterPool};
use crate::error::{EngineError, EngineResult};
use crate::metrics::TEST_ATTEMPTS_TOTAL;
use crate::models::{
    AnswerOption, AnswerRecord, AttemptHistoryEntry, AttemptKind, AttemptStatus, Question,
    QuestionPublic, SubmitResponse, TestAnswerAck, TestAnswerRequest, TestAttempt,
    TestStartResponse,
};
use crate::services::stats_service::StatsService;

pub const DEFAULT_FULL_TEST_SIZE: u32 = 100;
const MAX_FULL_TEST_SIZE: u32 = 200;

pub struct TestService {
    db: Database,
    weights: Vec<ChapterWeight>,
    scheme: MarkScheme,
}

impl TestService {
    pub fn new(db: Database, weights: Vec<ChapterWeight>, scheme: MarkScheme) -> Self {
        Self {
            db,
            weights,
            scheme,
        }
    }

    fn attempts(&self) -> Collection<TestAttempt> {
        self.db.collection::<TestAttempt>("test_attempts")
    }

    fn questions(&self) -> Collection<Question> {
        self.db.collection::<Question>("questions")
    }

    /// Generates a full test: slots split across chapters per the blueprint
    /// weights, questions drawn at random within each chapter, order shuffled
    /// across chapters before the attempt is frozen.
    pub async fn start_full_test(
        &self,
        user_id: &str,
        total_questions: Option<u32>,
    ) -> EngineResult<TestStartResponse> {
        let total = total_questions.unwrap_or(DEFAULT_FULL_TEST_SIZE);
        if total == 0 || total > MAX_FULL_TEST_SIZE {
            return Err(EngineError::Validation(format!(
                "total_questions must be between 1 and {}",
                MAX_FULL_TEST_SIZE
            )));
        }

        let per_chapter = self.chapter_id_pools().await?;
        let pools: Vec<ChapterPool> = per_chapter
            .iter()
            .map(|(weight, ids)| ChapterPool {
                chapter: weight.chapter.clone(),
                weight: weight.weight,
                available: ids.len(),
            })
            .collect();
        let allocation = allocate(total as usize, &pools)?;

        // The thread-local RNG is not Send and must not live across an await.
        let picked: Vec<String> = {
            let mut rng = rand::rng();
            let mut picked: Vec<String> = Vec::with_capacity(total as usize);
            for ((_, ids), count) in per_chapter.iter().zip(allocation) {
                picked.extend(ids.choose_multiple(&mut rng, count).cloned());
            }
            picked.shuffle(&mut rng);
            picked
        };

        let attempt = TestAttempt {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            kind: AttemptKind::Full,
            daily_date: None,
            question_ids: picked,
            answers: HashMap::new(),
            status: AttemptStatus::InProgress,
            result: None,
            created_at: Utc::now(),
            submitted_at: None,
        };
        self.attempts().insert_one(&attempt).await?;

        TEST_ATTEMPTS_TOTAL
            .with_label_values(&["full", "started"])
            .inc();
        StatsService::new(self.db.clone())
            .record_test_started(user_id, AttemptKind::Full)
            .await?;
        tracing::info!(
            "Full test started: {} ({} questions) for user {}",
            attempt.id,
            attempt.question_ids.len(),
            user_id
        );

        let questions = self.ordered_questions(&attempt.question_ids).await?;
        Ok(TestStartResponse {
            attempt_id: attempt.id,
            total_questions: questions.len() as u32,
            questions: questions.iter().map(QuestionPublic::from).collect(),
        })
    }

    /// Records one answer. Correctness is graded and stored now but only
    /// revealed at submit. Re-answering a question overwrites the selection
    /// and keeps the original `answered_at`.
    pub async fn answer(&self, user_id: &str, req: &TestAnswerRequest) -> EngineResult<TestAnswerAck> {
        let attempt = self.load_attempt(user_id, &req.attempt_id).await?;
        if attempt.status == AttemptStatus::Submitted {
            return Err(EngineError::InvalidState(
                "attempt is already submitted".to_string(),
            ));
        }
        if !attempt.question_ids.iter().any(|id| id == &req.question_id) {
            return Err(EngineError::Validation(format!(
                "question {} is not part of this attempt",
                req.question_id
            )));
        }

        let question = self
            .questions()
            .find_one(doc! { "_id": &req.question_id })
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("question {}", req.question_id)))?;

        let first_answer = !attempt.answers.contains_key(&req.question_id);
        let record = AnswerRecord {
            selected_option: req.selected_option,
            is_correct: scoring::is_correct(req.selected_option, question.correct_option),
            time_taken_seconds: req.time_taken_seconds,
            answered_at: attempt
                .answers
                .get(&req.question_id)
                .map(|existing| existing.answered_at)
                .unwrap_or_else(Utc::now),
        };
        let record_bson =
            mongodb::bson::to_bson(&record).map_err(|e| EngineError::Internal(e.into()))?;

        // Conditional on the attempt still being open; a concurrent submit
        // wins and this answer is rejected.
        let result = self
            .attempts()
            .update_one(
                doc! {
                    "_id": &attempt.id,
                    "user_id": user_id,
                    "status": "in_progress",
                },
                doc! { "$set": { format!("answers.{}", req.question_id): record_bson } },
            )
            .await?;
        if result.matched_count == 0 {
            return Err(EngineError::InvalidState(
                "attempt is already submitted".to_string(),
            ));
        }

        let stats = StatsService::new(self.db.clone());
        if first_answer {
            stats
                .record_answer(
                    user_id,
                    &question.chapter,
                    &question.category,
                    record.is_correct,
                )
                .await?;
        } else if let Some(previous) = attempt.answers.get(&req.question_id) {
            if previous.is_correct != record.is_correct {
                stats
                    .record_answer_correction(
                        user_id,
                        &question.chapter,
                        &question.category,
                        record.is_correct,
                    )
                    .await?;
            }
        }

        let answered_count = attempt.answers.len() as u32 + u32::from(first_answer);
        Ok(TestAnswerAck {
            attempt_id: attempt.id,
            question_id: req.question_id.clone(),
            selected_option: req.selected_option,
            answered_count,
        })
    }

    /// Scores and finalizes an attempt. The status transition is conditional,
    /// so a double submit fails instead of rescoring.
    pub async fn submit(&self, user_id: &str, attempt_id: &str) -> EngineResult<SubmitResponse> {
        let attempt = self.load_attempt(user_id, attempt_id).await?;
        if attempt.status == AttemptStatus::Submitted {
            return Err(EngineError::InvalidState(
                "attempt is already submitted".to_string(),
            ));
        }

        let questions = self.ordered_questions(&attempt.question_ids).await?;
        let keys: Vec<QuestionKey> = questions
            .iter()
            .map(|q| QuestionKey {
                id: q.id.clone(),
                chapter: q.chapter.clone(),
                category: q.category.clone(),
                correct_option: q.correct_option,
            })
            .collect();
        let answers: HashMap<String, AnswerOption> = attempt
            .answers
            .iter()
            .map(|(id, record)| (id.clone(), record.selected_option))
            .collect();
        let breakdown = scoring::score_attempt(&keys, &answers, &self.scheme);

        let result_bson =
            mongodb::bson::to_bson(&breakdown).map_err(|e| EngineError::Internal(e.into()))?;
        let submitted_at =
            mongodb::bson::to_bson(&Utc::now()).map_err(|e| EngineError::Internal(e.into()))?;
        let updated = self
            .attempts()
            .find_one_and_update(
                doc! {
                    "_id": attempt_id,
                    "user_id": user_id,
                    "status": "in_progress",
                },
                doc! { "$set": {
                    "status": "submitted",
                    "result": result_bson,
                    "submitted_at": submitted_at,
                } },
            )
            .await?;
        if updated.is_none() {
            return Err(EngineError::InvalidState(
                "attempt is already submitted".to_string(),
            ));
        }

        TEST_ATTEMPTS_TOTAL
            .with_label_values(&[attempt.kind.as_str(), "submitted"])
            .inc();
        StatsService::new(self.db.clone())
            .record_test_submitted(user_id, attempt.kind)
            .await?;
        tracing::info!(
            "Attempt submitted: {} (score {})",
            attempt_id,
            breakdown.final_score
        );

        Ok(SubmitResponse {
            attempt_id: attempt_id.to_string(),
            kind: attempt.kind,
            breakdown,
        })
    }

    /// The stored result of a submitted attempt.
    pub async fn result(&self, user_id: &str, attempt_id: &str) -> EngineResult<SubmitResponse> {
        let attempt = self.load_attempt(user_id, attempt_id).await?;
        match attempt.result {
            Some(breakdown) => Ok(SubmitResponse {
                attempt_id: attempt.id,
                kind: attempt.kind,
                breakdown,
            }),
            None => Err(EngineError::InvalidState(
                "attempt is not submitted yet".to_string(),
            )),
        }
    }

    pub async fn history(&self, user_id: &str) -> EngineResult<Vec<AttemptHistoryEntry>> {
        let attempts: Vec<TestAttempt> = self
            .attempts()
            .find(doc! { "user_id": user_id })
            .sort(doc! { "created_at": -1, "_id": -1 })
            .await?
            .try_collect()
            .await?;

        Ok(attempts
            .into_iter()
            .map(|attempt| AttemptHistoryEntry {
                attempt_id: attempt.id,
                kind: attempt.kind,
                total_questions: attempt.question_ids.len() as u32,
                status: attempt.status,
                final_score: attempt.result.map(|r| r.final_score),
                created_at: attempt.created_at,
                submitted_at: attempt.submitted_at,
            })
            .collect())
    }

    async fn chapter_id_pools(&self) -> EngineResult<Vec<(ChapterWeight, Vec<String>)>> {
        chapter_id_pools(&self.db, &self.weights).await
    }

    async fn ordered_questions(&self, ids: &[String]) -> EngineResult<Vec<Question>> {
        ordered_questions(&self.db, ids).await
    }

    async fn load_attempt(&self, user_id: &str, attempt_id: &str) -> EngineResult<TestAttempt> {
        self.attempts()
            .find_one(doc! { "_id": attempt_id, "user_id": user_id })
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("attempt {}", attempt_id)))
    }
}

/// Per-chapter candidate id lists for the configured blueprint, sorted so
/// selection does not depend on database iteration order.
pub(crate) async fn chapter_id_pools(
    db: &Database,
    weights: &[ChapterWeight],
) -> EngineResult<Vec<(ChapterWeight, Vec<String>)>> {
    let collection = db.collection::<Document>("questions");
    let mut pools = Vec::with_capacity(weights.len());
    for weight in weights {
        let mut ids: Vec<String> = collection
            .find(doc! { "chapter": &weight.chapter })
            .projection(doc! { "_id": 1 })
            .await?
            .try_collect::<Vec<Document>>()
            .await?
            .into_iter()
            .filter_map(|d| d.get_str("_id").ok().map(str::to_string))
            .collect();
        ids.sort();
        pools.push((weight.clone(), ids));
    }
    Ok(pools)
}

/// Loads questions by id, preserving the given order.
pub(crate) async fn ordered_questions(db: &Database, ids: &[String]) -> EngineResult<Vec<Question>> {
    let fetched: Vec<Question> = db
        .collection::<Question>("questions")
        .find(doc! { "_id": { "$in": ids } })
        .await?
        .try_collect()
        .await?;
    let mut by_id: HashMap<String, Question> =
        fetched.into_iter().map(|q| (q.id.clone(), q)).collect();

    let mut ordered = Vec::with_capacity(ids.len());
    for id in ids {
        let question = by_id
            .remove(id)
            .ok_or_else(|| EngineError::NotFound(format!("question {}", id)))?;
        ordered.push(question);
    }
    Ok(ordered)
}
