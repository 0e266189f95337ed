//! # Supabase
//!
//! Managed auth and table storage. This server keeps no data of its own, every
//! route is one or two calls through [`Backend`].
//!
//!
//!
//! ## Endpoints
//! - Auth (GoTrue) under `/auth/v1`: signup, password grant, current user
//! - Tables (PostgREST) under `/rest/v1`: the `profiles` table only
//!
//!
//!
//! ## Headers
//! - `apikey` on every request
//! - `Authorization: Bearer <apikey>` for service calls, the user's own access token for `/auth/v1/user`
//! - `Accept: application/vnd.pgrst.object+json` asks PostgREST for exactly one row, it answers 406 otherwise
//! - `Prefer: return=minimal` on writes so nothing is echoed back
//!
//!
//!
//! ## Errors
//! GoTrue and PostgREST disagree on the error field (`msg`, `message`,
//! `error_description`, `error`), so whichever comes first is surfaced.
use async_trait::async_trait;
use reqwest::{
    Client, Method, RequestBuilder, Response, StatusCode,
    header::{ACCEPT, HeaderValue},
};
use serde_json::Value;
use tracing::warn;

use crate::{
    config::Config,
    error::AppError,
    models::{
        AuthUser, Credentials, LeaderboardEntry, NewProfile, PROFILES_TABLE, Profile,
        ProgressUpdate, Session, SignUpResponse, TokenResponse,
    },
};

const SINGLE_ROW: &str = "application/vnd.pgrst.object+json";
const RETURN_MINIMAL: &str = "return=minimal";

#[async_trait]
pub trait Backend: Send + Sync {
    /// Registers a user and returns its id.
    async fn sign_up(&self, email: &str, password: &str) -> Result<String, AppError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError>;

    /// Resolves an access token to the user id it was issued for.
    async fn user_from_token(&self, access_token: &str) -> Result<String, AppError>;

    async fn insert_profile(&self, profile: &NewProfile) -> Result<(), AppError>;

    async fn fetch_profile(&self, user_id: &str) -> Result<Profile, AppError>;

    /// Writes xp and its derived level together.
    async fn update_progress(&self, user_id: &str, xp: i64, level: i64) -> Result<(), AppError>;

    /// Highest xp first.
    async fn top_profiles(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, AppError>;
}

pub struct Supabase {
    client: Client,
    base_url: String,
    api_key: String,
}

impl Supabase {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.upstream_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            api_key: config.supabase_key.clone(),
        })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }
}

#[async_trait]
impl Backend for Supabase {
    async fn sign_up(&self, email: &str, password: &str) -> Result<String, AppError> {
        let response = self
            .request(Method::POST, self.auth_url("signup"))
            .json(&Credentials { email, password })
            .send()
            .await?;

        let body: SignUpResponse = check(response).await?.json().await?;

        body.user_id()
            .ok_or(AppError::UnexpectedResponse("signup returned no user id"))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let response = self
            .request(Method::POST, self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .json(&Credentials { email, password })
            .send()
            .await?;

        let token: TokenResponse = check(response).await?.json().await?;

        Ok(Session {
            user_id: token.user.id,
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_in: token.expires_in,
        })
    }

    async fn user_from_token(&self, access_token: &str) -> Result<String, AppError> {
        let response = self
            .client
            .get(self.auth_url("user"))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        let user: AuthUser = check(response).await?.json().await?;

        Ok(user.id)
    }

    async fn insert_profile(&self, profile: &NewProfile) -> Result<(), AppError> {
        let response = self
            .request(Method::POST, self.table_url(PROFILES_TABLE))
            .header("Prefer", RETURN_MINIMAL)
            .json(profile)
            .send()
            .await?;

        check(response).await?;

        Ok(())
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<Profile, AppError> {
        let response = self
            .request(Method::GET, self.table_url(PROFILES_TABLE))
            .query(&[("id", format!("eq.{user_id}")), ("select", "*".to_string())])
            .header(ACCEPT, HeaderValue::from_static(SINGLE_ROW))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_ACCEPTABLE {
            return Err(AppError::ProfileNotFound(user_id.to_string()));
        }

        Ok(check(response).await?.json().await?)
    }

    async fn update_progress(&self, user_id: &str, xp: i64, level: i64) -> Result<(), AppError> {
        let response = self
            .request(Method::PATCH, self.table_url(PROFILES_TABLE))
            .query(&[("id", format!("eq.{user_id}"))])
            .header("Prefer", RETURN_MINIMAL)
            .json(&ProgressUpdate { xp, level })
            .send()
            .await?;

        check(response).await?;

        Ok(())
    }

    async fn top_profiles(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, AppError> {
        let response = self
            .request(Method::GET, self.table_url(PROFILES_TABLE))
            .query(&[
                ("select", "username,xp,level".to_string()),
                ("order", "xp.desc".to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }
}

async fn check(response: Response) -> Result<Response, AppError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await?;
    let message = error_message(&body).unwrap_or_else(|| fallback_message(status, &body));

    warn!("Supabase rejected request with {status}: {message}");

    Err(AppError::Rejected {
        status: status.as_u16(),
        message,
    })
}

fn error_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;

    ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|key| json.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

fn fallback_message(status: StatusCode, body: &str) -> String {
    let body = body.trim();

    if body.is_empty() {
        status.to_string()
    } else {
        body.to_string()
    }
}
