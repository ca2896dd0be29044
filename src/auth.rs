use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::AppError,
    models::{Role, Session, User},
    repository::RepositoryState,
};

/// Name of the cookie carrying the session credential.
pub const SESSION_COOKIE: &str = "news_session";

/// Claims
///
/// Payload of the session credential, signed with HS256. `jti` is the id of the
/// backing `sessions` row, which is what makes logout effective before `exp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user id.
    pub sub: i32,
    pub username: String,
    pub email: String,
    pub role: Role,
    /// The user's full name.
    pub name: String,
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// AuthUser
///
/// The resolved identity of an authenticated request, built once at the boundary and
/// passed explicitly to handlers and to the policy functions.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: i32,
    pub username: String,
    pub role: Role,
    /// `None` when the request came in through the local `x-user-id` bypass.
    pub session_id: Option<Uuid>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role,
            session_id: None,
        }
    }
}

/// AuthUser Extractor Implementation
///
/// Makes `AuthUser` usable as a handler argument. Resolution order:
/// 1. Local bypass: with `dev_bypass` on (never in production) an `x-user-id` header
///    naming an active user is enough.
/// 2. Credential: the `news_session` cookie, else an `Authorization: Bearer` header.
/// 3. Signature and `exp` validation.
/// 4. The session row must still exist and be unexpired (logout deletes it).
/// 5. The user is reloaded and must still be active.
///
/// Rejection: `AppError::Unauthorized` (401) for any credential problem.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.dev_bypass && config.env == Env::Local {
            if let Some(user_id) = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<i32>().ok())
            {
                if let Some(user) = repo.get_user(user_id).await? {
                    if user.active {
                        return Ok(AuthUser::from(&user));
                    }
                }
            }
        }

        let token = token_from_headers(&parts.headers).ok_or(AppError::Unauthorized)?;
        let claims = verify_token(&config, &token)?;

        if !repo.session_active(claims.jti, Utc::now()).await? {
            tracing::debug!(session_id = %claims.jti, "session revoked or expired");
            return Err(AppError::Unauthorized);
        }

        let user = repo
            .get_user(claims.sub)
            .await?
            .filter(|user| user.active)
            .ok_or(AppError::Unauthorized)?;

        Ok(AuthUser {
            id: user.id,
            username: user.username,
            role: user.role,
            session_id: Some(claims.jti),
        })
    }
}

/// token_from_headers
///
/// Reads the credential from the session cookie first, then from a Bearer header.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            pair.trim()
                .strip_prefix(SESSION_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
        })
        .find(|token| !token.is_empty())
        .map(str::to_string);

    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    })
}

/// Decodes and validates a credential (HS256 signature and `exp`).
pub fn verify_token(config: &AppConfig, token: &str) -> Result<Claims, AppError> {
    let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(data) => Ok(data.claims),
        Err(e) => {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("rejected expired credential"),
                _ => tracing::debug!("rejected credential: {:?}", e),
            }
            Err(AppError::Unauthorized)
        }
    }
}

pub fn sign_claims(config: &AppConfig, claims: &Claims) -> Result<String, AppError> {
    let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    Ok(encode(&Header::new(Algorithm::HS256), claims, &encoding_key)?)
}

/// authenticate
///
/// Checks a username/password pair against the active users. An unknown user and a
/// wrong password produce the same `InvalidCredentials` after the same bcrypt work; only
/// the logs tell them apart.
pub async fn authenticate(
    repo: &RepositoryState,
    config: &AppConfig,
    username: &str,
    password: &str,
) -> Result<User, AppError> {
    let Some(user) = repo.find_active_user_by_username(username).await? else {
        // Same bcrypt work as a wrong password.
        let cost = config.bcrypt_cost;
        verify_password(password.to_owned(), move || dummy_hash(cost).to_owned()).await;
        tracing::warn!(%username, "login rejected: unknown or inactive user");
        return Err(AppError::InvalidCredentials);
    };

    let stored_hash = user.password_hash.clone();
    if !verify_password(password.to_owned(), move || stored_hash).await {
        tracing::warn!(user_id = user.id, "login rejected: password mismatch");
        return Err(AppError::InvalidCredentials);
    }

    Ok(user)
}

/// A freshly issued credential together with its decoded claims.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub claims: Claims,
    pub expires_at: DateTime<Utc>,
}

/// issue_session
///
/// Persists a session row and signs the matching credential. The expiry is absolute:
/// `session_ttl_hours` after issuance. The user's expired rows are dropped first.
pub async fn issue_session(
    repo: &RepositoryState,
    config: &AppConfig,
    user: &User,
) -> Result<IssuedSession, AppError> {
    let issued_at = Utc::now();
    let purged = repo.purge_expired_sessions(user.id, issued_at).await?;
    if purged > 0 {
        tracing::debug!(user_id = user.id, purged, "expired sessions removed");
    }
    let expires_at = issued_at + Duration::hours(config.session_ttl_hours);
    let session = Session {
        id: Uuid::new_v4(),
        user_id: user.id,
        issued_at,
        expires_at,
    };
    repo.create_session(&session).await?;

    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        role: user.role,
        name: user.full_name.clone(),
        jti: session.id,
        iat: issued_at.timestamp(),
        exp: expires_at.timestamp(),
    };
    let token = sign_claims(config, &claims)?;

    tracing::info!(user_id = user.id, session_id = %session.id, "session issued");
    Ok(IssuedSession {
        token,
        claims,
        expires_at,
    })
}

/// bcrypt on the blocking pool. A malformed stored hash or a panicked task counts as a
/// mismatch.
async fn verify_password<F>(candidate: String, stored_hash: F) -> bool
where
    F: FnOnce() -> String + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        bcrypt::verify(&candidate, &stored_hash()).unwrap_or(false)
    })
    .await
    .unwrap_or(false)
}

/// Hash of a random secret at the configured cost, computed once per process.
fn dummy_hash(cost: u32) -> &'static str {
    static DUMMY_HASH: OnceLock<String> = OnceLock::new();
    DUMMY_HASH.get_or_init(|| {
        bcrypt::hash(Uuid::new_v4().to_string(), cost).unwrap_or_default()
    })
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    Ok(bcrypt::hash(password, cost)?)
}

/// [`hash_password`] on the blocking pool, for use inside request handlers.
pub async fn hash_password_async(password: String, cost: u32) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password, cost)).await?
}

/// `Set-Cookie` value carrying the credential. `Secure` is added outside local runs.
pub fn session_cookie(config: &AppConfig, token: &str) -> String {
    let max_age = config.session_ttl_hours * 3600;
    let mut cookie =
        format!("{SESSION_COOKIE}={token}; HttpOnly; Path=/; SameSite=Lax; Max-Age={max_age}");
    if config.env == Env::Production {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that makes the browser drop the credential.
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0")
}
