use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct ChapterWeight {
    pub chapter: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mongo_uri: String,
    pub mongo_database: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub admin_email: String,
    pub admin_password: String,
    pub chapter_weights: Vec<ChapterWeight>,
    pub marks_per_correct: f64,
    pub negative_mark_per_wrong: f64,
    pub clamp_negative_total: bool,
}

/// Default exam blueprint. Overridable through `config/*.toml`, kept in sync
/// with the published syllabus weightage table.
fn default_chapter_weights() -> Vec<ChapterWeight> {
    [
        ("Pharmacology", 0.32),
        ("Pharmaceutics", 0.20),
        ("Drug Laws", 0.15),
        ("Microbiology", 0.10),
        ("Pharmaceutical Chemistry", 0.10),
        ("Hospital Pharmacy", 0.07),
        ("Reasoning", 0.06),
    ]
    .into_iter()
    .map(|(chapter, weight)| ChapterWeight {
        chapter: chapter.to_string(),
        weight,
    })
    .collect()
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let env_name = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env_name)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let mongo_uri = settings
            .get_string("database.mongo_uri")
            .or_else(|_| env::var("MONGO_URI"))
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

        let mongo_database = settings
            .get_string("database.mongo_database")
            .or_else(|_| env::var("MONGO_DATABASE"))
            .unwrap_or_else(|_| "exambank".to_string());

        let jwt_secret = settings
            .get_string("auth.jwt_secret")
            .or_else(|_| env::var("JWT_SECRET"))
            .unwrap_or_else(|_| {
                if env_name == "prod" {
                    panic!("FATAL: JWT_SECRET must be set in production!");
                }
                eprintln!("WARNING: Using default JWT_SECRET (dev mode only!)");
                "dev-secret-only-for-local-testing".to_string()
            });

        let bind_addr = settings
            .get_string("server.bind_addr")
            .or_else(|_| env::var("BIND_ADDR"))
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let admin_email = settings
            .get_string("auth.admin_email")
            .or_else(|_| env::var("ADMIN_EMAIL"))
            .unwrap_or_else(|_| "admin@example.com".to_string());

        let admin_password = settings
            .get_string("auth.admin_password")
            .or_else(|_| env::var("ADMIN_PASSWORD"))
            .unwrap_or_else(|_| {
                if env_name == "prod" {
                    panic!("FATAL: ADMIN_PASSWORD must be set in production!");
                }
                eprintln!("WARNING: Using default ADMIN_PASSWORD (dev mode only!)");
                "changeme123".to_string()
            });

        let chapter_weights = settings
            .get::<Vec<ChapterWeight>>("exam.chapter_weights")
            .unwrap_or_else(|_| default_chapter_weights());

        let marks_per_correct = settings.get_float("exam.marks_per_correct").unwrap_or(1.0);
        let negative_mark_per_wrong = settings
            .get_float("exam.negative_mark_per_wrong")
            .unwrap_or(0.25);
        let clamp_negative_total = settings
            .get_bool("exam.clamp_negative_total")
            .unwrap_or(false);

        Ok(Config {
            mongo_uri,
            mongo_database,
            jwt_secret,
            bind_addr,
            admin_email,
            admin_password,
            chapter_weights,
            marks_per_correct,
            negative_mark_per_wrong,
            clamp_negative_total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_sum_to_one() {
        let weights = default_chapter_weights();
        assert_eq!(weights.len(), 7);
        let sum: f64 = weights.iter().map(|w| w.weight).sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }
}
