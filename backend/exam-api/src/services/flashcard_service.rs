use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::{Collection, Database};
use rand::seq::SliceRandom;
use uuid::Uuid;

use crate::engine::{queue, scoring};
use crate::error::{EngineError, EngineResult};
use crate::metrics::{FLASHCARD_ANSWERS_TOTAL, MASTERY_SESSIONS_TOTAL};
use crate::models::{
    Deck, FlashcardAnswerLog, FlashcardAnswerRequest, FlashcardAnswerResult, MasterySession,
    NextFlashcardResponse, Question, QuestionPublic, StartSessionResponse,
};
use crate::services::stats_service::StatsService;

pub struct FlashcardService {
    db: Database,
}

impl FlashcardService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn sessions(&self) -> Collection<MasterySession> {
        self.db.collection::<MasterySession>("mastery_sessions")
    }

    fn questions(&self) -> Collection<Question> {
        self.db.collection::<Question>("questions")
    }

    /// Starts a mastery session over a deck. The queue order is shuffled once
    /// here and then only rotated; answers never reshuffle it.
    pub async fn start_session(
        &self,
        user_id: &str,
        deck_id: &str,
    ) -> EngineResult<StartSessionResponse> {
        let deck = self
            .db
            .collection::<Deck>("decks")
            .find_one(doc! { "_id": deck_id, "active": true })
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("deck {}", deck_id)))?;

        let questions: Vec<Question> = self
            .questions()
            .find(doc! { "deck_id": deck_id })
            .await?
            .try_collect()
            .await?;
        if questions.is_empty() {
            return Err(EngineError::NotFound(format!(
                "questions in deck {}",
                deck.id
            )));
        }

        let mut pending: Vec<String> = questions.into_iter().map(|q| q.id).collect();
        pending.shuffle(&mut rand::rng());

        let session = MasterySession {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            deck_id: deck.id.clone(),
            total_questions: pending.len() as u32,
            pending,
            retired: Vec::new(),
            completed: false,
            version: 0,
            created_at: Utc::now(),
        };
        self.sessions().insert_one(&session).await?;

        MASTERY_SESSIONS_TOTAL.with_label_values(&["started"]).inc();
        StatsService::new(self.db.clone())
            .record_flashcard_session_started(user_id)
            .await?;
        tracing::info!(
            "Mastery session started: {} (deck {}, {} questions)",
            session.id,
            deck.id,
            session.total_questions
        );

        Ok(StartSessionResponse {
            session_id: session.id,
            deck_id: deck.id,
            total_questions: session.total_questions,
            pending_count: session.total_questions,
        })
    }

    /// Serves the current head of the queue without revealing the answer.
    pub async fn next_card(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> EngineResult<NextFlashcardResponse> {
        let session = self.load_session(user_id, session_id).await?;

        let question = match session.current_question_id() {
            Some(question_id) => Some(QuestionPublic::from(
                &self.load_question(question_id).await?,
            )),
            None => None,
        };

        Ok(NextFlashcardResponse {
            session_id: session.id,
            question,
            pending_count: session.pending.len() as u32,
            completed: session.completed,
        })
    }

    /// Grades the head card and advances the queue. The update is conditional
    /// on the session version read above, so of two concurrent answers exactly
    /// one lands; the loser gets a sequence error. A wrong answer on a
    /// one-card queue rotates the head onto itself, which is why the head
    /// filter alone would not be enough.
    pub async fn answer(
        &self,
        user_id: &str,
        req: &FlashcardAnswerRequest,
    ) -> EngineResult<FlashcardAnswerResult> {
        let session = self.load_session(user_id, &req.session_id).await?;
        let question = self.load_question(&req.question_id).await?;

        let is_correct = scoring::is_correct(req.selected_option, question.correct_option);
        let transition = queue::apply_answer(
            &session.pending,
            &session.retired,
            &req.question_id,
            is_correct,
        )?;

        let pending_bson = mongodb::bson::to_bson(&transition.pending)
            .map_err(|e| EngineError::Internal(e.into()))?;
        let retired_bson = mongodb::bson::to_bson(&transition.retired)
            .map_err(|e| EngineError::Internal(e.into()))?;
        let result = self
            .sessions()
            .update_one(
                doc! {
                    "_id": &session.id,
                    "user_id": user_id,
                    "completed": false,
                    "version": session.version,
                    "pending.0": &req.question_id,
                },
                doc! {
                    "$set": {
                        "pending": pending_bson,
                        "retired": retired_bson,
                        "completed": transition.completed,
                    },
                    "$inc": { "version": 1_i64 },
                },
            )
            .await?;
        if result.matched_count == 0 {
            // Someone else advanced the queue between our read and write.
            return Err(EngineError::Sequence(format!(
                "question {} is not the current head of the queue",
                req.question_id
            )));
        }

        self.db
            .collection::<FlashcardAnswerLog>("flashcard_answers")
            .insert_one(&FlashcardAnswerLog {
                id: Uuid::new_v4().to_string(),
                session_id: session.id.clone(),
                user_id: user_id.to_string(),
                question_id: req.question_id.clone(),
                selected_option: req.selected_option,
                is_correct,
                time_taken_seconds: req.time_taken_seconds,
                answered_at: Utc::now(),
            })
            .await?;

        FLASHCARD_ANSWERS_TOTAL
            .with_label_values(&[if is_correct { "true" } else { "false" }])
            .inc();
        let stats = StatsService::new(self.db.clone());
        stats
            .record_answer(user_id, &question.chapter, &question.category, is_correct)
            .await?;
        if transition.completed {
            MASTERY_SESSIONS_TOTAL
                .with_label_values(&["completed"])
                .inc();
            stats.record_flashcard_session_completed(user_id).await?;
            tracing::info!("Mastery session completed: {}", session.id);
        }

        Ok(FlashcardAnswerResult {
            is_correct,
            correct_option: question.correct_option,
            selected_option: req.selected_option,
            explanation: question.explanation,
            pending_count: transition.pending.len() as u32,
            completed: transition.completed,
        })
    }

    pub async fn get_session(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> EngineResult<MasterySession> {
        self.load_session(user_id, session_id).await
    }

    async fn load_session(&self, user_id: &str, session_id: &str) -> EngineResult<MasterySession> {
        self.sessions()
            .find_one(doc! { "_id": session_id, "user_id": user_id })
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("session {}", session_id)))
    }

    async fn load_question(&self, question_id: &str) -> EngineResult<Question> {
        self.questions()
            .find_one(doc! { "_id": question_id })
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("question {}", question_id)))
    }
}
