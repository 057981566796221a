use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::UpdateOptions;
use mongodb::{Collection, Database};

use crate::error::EngineResult;
use crate::models::{AttemptKind, BankStats, UserStatsDoc, UserStatsResponse};

pub struct StatsService {
    db: Database,
}

impl StatsService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn user_stats(&self) -> Collection<UserStatsDoc> {
        self.db.collection::<UserStatsDoc>("user_stats")
    }

    pub async fn record_flashcard_session_started(&self, user_id: &str) -> EngineResult<()> {
        self.inc(user_id, doc! { "flashcard_sessions_started": 1 })
            .await
    }

    pub async fn record_flashcard_session_completed(&self, user_id: &str) -> EngineResult<()> {
        self.inc(user_id, doc! { "flashcard_sessions_completed": 1 })
            .await
    }

    pub async fn record_test_started(&self, user_id: &str, kind: AttemptKind) -> EngineResult<()> {
        let field = match kind {
            AttemptKind::Full => "full_tests_started",
            AttemptKind::Daily => "daily_tests_started",
        };
        self.inc(user_id, doc! { field: 1 }).await
    }

    pub async fn record_test_submitted(&self, user_id: &str, kind: AttemptKind) -> EngineResult<()> {
        let field = match kind {
            AttemptKind::Full => "full_tests_submitted",
            AttemptKind::Daily => "daily_tests_submitted",
        };
        self.inc(user_id, doc! { field: 1 }).await
    }

    /// Folds one answered question into the running per-user aggregates.
    pub async fn record_answer(
        &self,
        user_id: &str,
        chapter: &str,
        category: &str,
        is_correct: bool,
    ) -> EngineResult<()> {
        self.inc(user_id, answer_fields(chapter, category, is_correct))
            .await
    }

    /// Moves the correctness counts when a re-answer flips a question from
    /// right to wrong or back. Attempted counts stay put; the question was
    /// already counted when first answered.
    pub async fn record_answer_correction(
        &self,
        user_id: &str,
        chapter: &str,
        category: &str,
        now_correct: bool,
    ) -> EngineResult<()> {
        self.inc(user_id, correction_fields(chapter, category, now_correct))
            .await
    }

    pub async fn get_user_stats(&self, user_id: &str) -> EngineResult<UserStatsResponse> {
        let doc = self
            .user_stats()
            .find_one(doc! { "_id": user_id })
            .await?
            .unwrap_or_else(|| UserStatsDoc::empty(user_id));
        Ok(UserStatsResponse::from(doc))
    }

    /// Bank-wide totals for the admin dashboard.
    pub async fn bank_stats(&self) -> EngineResult<BankStats> {
        let questions = self.db.collection::<Document>("questions");
        let total_questions = questions.count_documents(doc! {}).await?;
        let total_decks = self
            .db
            .collection::<Document>("decks")
            .count_documents(doc! {})
            .await?;

        let by_chapter = self.group_counts(&questions, "$chapter").await?;
        let by_category = self.group_counts(&questions, "$category").await?;

        Ok(BankStats {
            total_questions,
            total_decks,
            by_chapter,
            by_category,
        })
    }

    async fn group_counts(
        &self,
        questions: &Collection<Document>,
        field: &str,
    ) -> EngineResult<std::collections::BTreeMap<String, u64>> {
        let pipeline = vec![doc! { "$group": { "_id": field, "count": { "$sum": 1 } } }];
        let mut counts = std::collections::BTreeMap::new();
        let mut cursor = questions.aggregate(pipeline).await?;
        while let Some(doc) = cursor.try_next().await? {
            let name = doc.get_str("_id").unwrap_or_default().to_string();
            let count = doc
                .get_i32("count")
                .map(|v| v as u64)
                .or_else(|_| doc.get_i64("count").map(|v| v as u64))
                .unwrap_or(0);
            counts.insert(name, count);
        }
        Ok(counts)
    }

    async fn inc(&self, user_id: &str, fields: Document) -> EngineResult<()> {
        self.user_stats()
            .update_one(doc! { "_id": user_id }, doc! { "$inc": fields })
            .with_options(UpdateOptions::builder().upsert(true).build())
            .await?;
        Ok(())
    }
}

fn answer_fields(chapter: &str, category: &str, is_correct: bool) -> Document {
    let chapter = field_key(chapter);
    let category = field_key(category);
    let mut inc = doc! {
        "answers_total": 1,
        format!("chapters.{}.attempted", chapter): 1,
        format!("categories.{}.attempted", category): 1,
    };
    if is_correct {
        inc.insert("answers_correct", 1);
        inc.insert(format!("chapters.{}.correct", chapter), 1);
        inc.insert(format!("categories.{}.correct", category), 1);
    }
    inc
}

fn correction_fields(chapter: &str, category: &str, now_correct: bool) -> Document {
    let delta: i32 = if now_correct { 1 } else { -1 };
    let chapter = field_key(chapter);
    let category = field_key(category);
    doc! {
        "answers_correct": delta,
        format!("chapters.{}.correct", chapter): delta,
        format!("categories.{}.correct", category): delta,
    }
}

// Mongo field paths cannot contain dots or start with '$'.
fn field_key(name: &str) -> String {
    name.replace(['.', '$'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_key_strips_path_characters() {
        assert_eq!(field_key("Drug Laws"), "Drug Laws");
        assert_eq!(field_key("sec. 3.1"), "sec_ 3_1");
        assert_eq!(field_key("$group"), "_group");
    }

    #[test]
    fn wrong_answer_counts_attempted_but_not_correct() {
        let fields = answer_fields("Drug Laws", "case law", false);
        assert_eq!(fields.get_i32("answers_total").unwrap(), 1);
        assert!(fields.get("answers_correct").is_none());
        assert_eq!(fields.get_i32("chapters.Drug Laws.attempted").unwrap(), 1);
    }

    #[test]
    fn correction_moves_correct_counts_without_touching_attempted() {
        let up = correction_fields("Pharmacology", "technical", true);
        assert_eq!(up.get_i32("answers_correct").unwrap(), 1);
        assert_eq!(up.get_i32("chapters.Pharmacology.correct").unwrap(), 1);
        assert!(up.get("answers_total").is_none());
        assert!(up.get("chapters.Pharmacology.attempted").is_none());

        let down = correction_fields("Pharmacology", "technical", false);
        assert_eq!(down.get_i32("answers_correct").unwrap(), -1);
        assert_eq!(down.get_i32("categories.technical.correct").unwrap(), -1);
    }
}
