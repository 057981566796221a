use crate::config::Config;
use mongodb::bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Client as MongoClient, Database, IndexModel};

pub struct AppState {
    pub config: Config,
    pub mongo: Database,
}

impl AppState {
    pub async fn new(config: Config, mongo_client: MongoClient) -> anyhow::Result<Self> {
        let mongo = mongo_client.database(&config.mongo_database);
        Ok(Self { config, mongo })
    }
}

/// Creates the indexes the services rely on. Safe to call on every startup;
/// MongoDB treats existing identical indexes as a no-op.
pub async fn ensure_indexes(db: &Database) -> anyhow::Result<()> {
    let unique = IndexOptions::builder().unique(true).build();

    db.collection::<crate::models::User>("users")
        .create_index(
            IndexModel::builder()
                .keys(doc! { "email": 1 })
                .options(unique.clone())
                .build(),
        )
        .await?;

    db.collection::<crate::models::DeckView>("deck_views")
        .create_index(
            IndexModel::builder()
                .keys(doc! { "deck_id": 1, "user_id": 1 })
                .options(unique.clone())
                .build(),
        )
        .await?;

    // One shared paper per calendar date; concurrent first callers race on
    // this index and the loser re-reads the winner's document.
    db.collection::<crate::models::DailyTest>("daily_tests")
        .create_index(
            IndexModel::builder()
                .keys(doc! { "test_date": 1 })
                .options(unique)
                .build(),
        )
        .await?;

    db.collection::<crate::models::Question>("questions")
        .create_index(IndexModel::builder().keys(doc! { "chapter": 1 }).build())
        .await?;

    db.collection::<crate::models::TestAttempt>("test_attempts")
        .create_index(IndexModel::builder().keys(doc! { "user_id": 1 }).build())
        .await?;

    // At most one daily attempt per user per date.
    db.collection::<crate::models::TestAttempt>("test_attempts")
        .create_index(
            IndexModel::builder()
                .keys(doc! { "user_id": 1, "daily_date": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .partial_filter_expression(doc! { "kind": "daily" })
                        .build(),
                )
                .build(),
        )
        .await?;

    db.collection::<crate::models::MasterySession>("mastery_sessions")
        .create_index(IndexModel::builder().keys(doc! { "user_id": 1 }).build())
        .await?;

    db.collection::<crate::models::FlashcardAnswerLog>("flashcard_answers")
        .create_index(
            IndexModel::builder()
                .keys(doc! { "session_id": 1, "answered_at": 1 })
                .build(),
        )
        .await?;

    tracing::info!("MongoDB indexes ensured");
    Ok(())
}

/// True when the error is a unique index violation (server code 11000).
pub(crate) fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == 11000
    )
}

pub mod auth_service;
pub mod daily_test_service;
pub mod deck_service;
pub mod flashcard_service;
pub mod stats_service;
pub mod test_service;
