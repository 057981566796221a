use anyhow::Context;
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use mongodb::bson::doc;
use mongodb::{Collection, Database};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::middlewares::auth::{JwtClaims, JwtService};
use crate::models::{TokenResponse, User, UserProfile, ROLE_ADMIN, ROLE_USER};
use crate::services::is_duplicate_key;

const TOKEN_TTL_SECONDS: i64 = 24 * 3600;

pub struct AuthService {
    db: Database,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(db: Database, jwt_secret: String) -> Self {
        Self { db, jwt_secret }
    }

    fn users(&self) -> Collection<User> {
        self.db.collection::<User>("users")
    }

    pub async fn register(&self, email: &str, password: &str) -> EngineResult<TokenResponse> {
        let password_hash = hash(password, DEFAULT_COST).context("Failed to hash password")?;

        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.trim().to_lowercase(),
            password_hash,
            role: ROLE_USER.to_string(),
            created_at: Utc::now(),
        };

        match self.users().insert_one(&user).await {
            Ok(_) => {}
            Err(e) if is_duplicate_key(&e) => {
                return Err(EngineError::Validation(
                    "email already registered".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!("User registered: {}", user.id);
        self.issue_token(&user)
    }

    pub async fn login(&self, email: &str, password: &str) -> EngineResult<TokenResponse> {
        let email = email.trim().to_lowercase();
        let user = self
            .users()
            .find_one(doc! { "email": &email })
            .await?
            .ok_or_else(|| EngineError::Unauthorized("invalid credentials".to_string()))?;

        let valid =
            verify(password, &user.password_hash).context("Failed to verify password hash")?;
        if !valid {
            return Err(EngineError::Unauthorized("invalid credentials".to_string()));
        }

        tracing::info!("User logged in: {}", user.id);
        self.issue_token(&user)
    }

    pub async fn current_user(&self, user_id: &str) -> EngineResult<UserProfile> {
        let user = self
            .users()
            .find_one(doc! { "_id": user_id })
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("user {}", user_id)))?;
        Ok(UserProfile::from(&user))
    }

    /// Creates the admin account on first startup if it does not exist yet.
    pub async fn seed_admin(&self, email: &str, password: &str) -> EngineResult<()> {
        let email = email.trim().to_lowercase();
        if self.users().find_one(doc! { "email": &email }).await?.is_some() {
            return Ok(());
        }

        let password_hash = hash(password, DEFAULT_COST).context("Failed to hash password")?;
        let admin = User {
            id: Uuid::new_v4().to_string(),
            email,
            password_hash,
            role: ROLE_ADMIN.to_string(),
            created_at: Utc::now(),
        };

        match self.users().insert_one(&admin).await {
            Ok(_) => {
                tracing::info!("Admin account seeded: {}", admin.email);
                Ok(())
            }
            // Lost the race against a parallel startup; the account exists.
            Err(e) if is_duplicate_key(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn issue_token(&self, user: &User) -> EngineResult<TokenResponse> {
        let now = Utc::now().timestamp();
        let claims = JwtClaims {
            sub: user.id.clone(),
            role: user.role.clone(),
            exp: (now + TOKEN_TTL_SECONDS) as usize,
            iat: now as usize,
        };

        let access_token = JwtService::new(&self.jwt_secret)
            .generate_token(claims)
            .map_err(|e| EngineError::Internal(anyhow::anyhow!("Failed to sign token: {}", e)))?;

        Ok(TokenResponse {
            access_token,
            user: UserProfile::from(user),
        })
    }
}
