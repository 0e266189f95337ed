use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header::AUTHORIZATION, header::CONTENT_TYPE},
};
use http_body_util::BodyExt;
use serde_json::{Map, Value, json};
use server::{
    config::Config,
    error::AppError,
    models::{LeaderboardEntry, NewProfile, Profile, Session},
    router,
    state::State,
    supabase::Backend,
};
use tower::ServiceExt;

#[derive(Default)]
struct MemoryBackend {
    users: Mutex<HashMap<String, (String, String)>>,
    profiles: Mutex<HashMap<String, Profile>>,
}

impl MemoryBackend {
    fn with_profile(self, id: &str, username: &str, xp: i64, level: i64) -> Self {
        self.users.lock().unwrap().insert(
            format!("{id}@example.com"),
            (id.to_string(), "hunter2".to_string()),
        );
        self.profiles.lock().unwrap().insert(
            id.to_string(),
            Profile {
                id: id.to_string(),
                email: Some(format!("{id}@example.com")),
                username: Some(username.to_string()),
                character: None,
                xp,
                level,
                streak: 1,
                extra: Map::new(),
            },
        );
        self
    }

    fn profile(&self, id: &str) -> Profile {
        self.profiles.lock().unwrap()[id].clone()
    }
}

fn token_for(user_id: &str) -> String {
    format!("token-{user_id}")
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn sign_up(&self, email: &str, password: &str) -> Result<String, AppError> {
        let mut users = self.users.lock().unwrap();

        if users.contains_key(email) {
            return Err(AppError::Rejected {
                status: 422,
                message: "User already registered".into(),
            });
        }

        let id = format!("user-{}", users.len() + 1);
        users.insert(email.to_string(), (id.clone(), password.to_string()));

        Ok(id)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let users = self.users.lock().unwrap();

        match users.get(email) {
            Some((id, stored)) if stored == password => Ok(Session {
                user_id: id.clone(),
                access_token: token_for(id),
                refresh_token: Some("refresh".into()),
                expires_in: Some(3600),
            }),
            _ => Err(AppError::Rejected {
                status: 400,
                message: "Invalid login credentials".into(),
            }),
        }
    }

    async fn user_from_token(&self, access_token: &str) -> Result<String, AppError> {
        access_token
            .strip_prefix("token-")
            .map(str::to_string)
            .ok_or(AppError::Rejected {
                status: 401,
                message: "invalid JWT".into(),
            })
    }

    async fn insert_profile(&self, profile: &NewProfile) -> Result<(), AppError> {
        self.profiles.lock().unwrap().insert(
            profile.id.clone(),
            Profile {
                id: profile.id.clone(),
                email: Some(profile.email.clone()),
                username: profile.username.clone(),
                character: profile.character.clone(),
                xp: profile.xp,
                level: profile.level,
                streak: profile.streak,
                extra: Map::new(),
            },
        );

        Ok(())
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<Profile, AppError> {
        self.profiles
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .ok_or_else(|| AppError::ProfileNotFound(user_id.to_string()))
    }

    async fn update_progress(&self, user_id: &str, xp: i64, level: i64) -> Result<(), AppError> {
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles
            .get_mut(user_id)
            .ok_or_else(|| AppError::ProfileNotFound(user_id.to_string()))?;

        profile.xp = xp;
        profile.level = level;

        Ok(())
    }

    async fn top_profiles(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, AppError> {
        let mut entries: Vec<LeaderboardEntry> = self
            .profiles
            .lock()
            .unwrap()
            .values()
            .map(|profile| LeaderboardEntry {
                username: profile.username.clone(),
                xp: profile.xp,
                level: profile.level,
            })
            .collect();

        entries.sort_by(|a, b| b.xp.cmp(&a.xp));
        entries.truncate(limit);

        Ok(entries)
    }
}

fn app(backend: Arc<MemoryBackend>) -> Router {
    router(State::with_backend(Config::default(), backend))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_home() {
    let response = app(Arc::default()).oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_signup_creates_fresh_profile() {
    let backend = Arc::new(MemoryBackend::default());

    let (status, body) = send(
        app(backend.clone()),
        post_json(
            "/api/signup",
            json!({
                "email": "ada@example.com",
                "password": "analytical",
                "username": "  ada   lovelace ",
                "character": "owl"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Signup successful");

    let user_id = body["user_id"].as_str().unwrap();
    let profile = backend.profile(user_id);

    assert_eq!(profile.username.as_deref(), Some("ada lovelace"));
    assert_eq!(profile.character.as_deref(), Some("owl"));
    assert_eq!(profile.xp, 0);
    assert_eq!(profile.level, 1);
    assert_eq!(profile.streak, 1);
}

#[tokio::test]
async fn test_signup_requires_credentials() {
    let (status, body) = send(
        app(Arc::default()),
        post_json("/api/signup", json!({ "email": "ada@example.com" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email and password are required");
}

#[tokio::test]
async fn test_signup_rejects_bad_email() {
    let (status, body) = send(
        app(Arc::default()),
        post_json(
            "/api/signup",
            json!({ "email": "not-an-email", "password": "pw" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid email");
}

#[tokio::test]
async fn test_signup_duplicate_passes_upstream_message() {
    let backend = Arc::new(MemoryBackend::default().with_profile("ada", "ada", 0, 1));

    let (status, body) = send(
        app(backend),
        post_json(
            "/api/signup",
            json!({ "email": "ada@example.com", "password": "pw" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User already registered");
}

#[tokio::test]
async fn test_malformed_payload() {
    let request = Request::post("/api/login")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = send(app(Arc::default()), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Malformed payload");
}

#[tokio::test]
async fn test_login() {
    let backend = Arc::new(MemoryBackend::default().with_profile("grace", "grace", 0, 1));

    let (status, body) = send(
        app(backend.clone()),
        post_json(
            "/api/login",
            json!({ "email": "grace@example.com", "password": "hunter2" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["user_id"], "grace");
    assert_eq!(body["access_token"], "token-grace");

    let (status, body) = send(
        app(backend),
        post_json(
            "/api/login",
            json!({ "email": "grace@example.com", "password": "wrong" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid login credentials");
}

#[tokio::test]
async fn test_profile_includes_progress() {
    let backend = Arc::new(MemoryBackend::default().with_profile("linus", "linus", 275, 1));

    let (status, body) = send(app(backend), get("/api/profile?user_id=linus")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "linus");
    assert_eq!(body["xp"], 275);
    assert_eq!(body["level"], 3);
    assert_eq!(body["progress"]["current_level"], 3);
    assert_eq!(body["progress"]["xp_progress"], 75);
    assert_eq!(body["progress"]["progress_percentage"], 75.0);
}

#[tokio::test]
async fn test_profile_progress_column_is_replaced() {
    let backend = MemoryBackend::default().with_profile("mae", "mae", 150, 2);
    backend
        .profiles
        .lock()
        .unwrap()
        .get_mut("mae")
        .unwrap()
        .extra
        .insert("progress".into(), json!("stale"));

    let response = app(Arc::new(backend))
        .oneshot(get("/api/profile?user_id=mae"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert_eq!(text.matches("\"progress\"").count(), 1);

    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["progress"]["xp_progress"], 50);
}

#[tokio::test]
async fn test_profile_errors() {
    let (status, body) = send(app(Arc::default()), get("/api/profile")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "user_id is required");

    let (status, _) = send(app(Arc::default()), get("/api/profile?user_id=ghost")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_add_xp_crosses_level() {
    let backend = Arc::new(MemoryBackend::default().with_profile("ken", "ken", 80, 1));

    let (status, body) = send(
        app(backend.clone()),
        post_json("/api/addxp", json!({ "user_id": "ken", "xp": 50 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["xp"], 130);
    assert_eq!(body["level"], 2);
    assert_eq!(body["progress"]["progress_percentage"], 30.0);

    let profile = backend.profile("ken");
    assert_eq!(profile.xp, 130);
    assert_eq!(profile.level, 2);
}

#[tokio::test]
async fn test_add_xp_never_negative() {
    let backend = Arc::new(MemoryBackend::default().with_profile("ken", "ken", 30, 1));

    let (status, body) = send(
        app(backend.clone()),
        post_json("/api/addxp", json!({ "user_id": "ken", "xp": -500 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["xp"], 0);
    assert_eq!(body["level"], 1);
    assert_eq!(backend.profile("ken").xp, 0);
}

#[tokio::test]
async fn test_add_xp_defaults_to_zero_delta() {
    let backend = Arc::new(MemoryBackend::default().with_profile("ken", "ken", 100, 1));

    let (status, body) = send(
        app(backend.clone()),
        post_json("/api/addxp", json!({ "user_id": "ken" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["xp"], 100);
    // stale stored level is repaired on write
    assert_eq!(backend.profile("ken").level, 2);
}

#[tokio::test]
async fn test_add_xp_requires_user() {
    let (status, body) = send(
        app(Arc::default()),
        post_json("/api/addxp", json!({ "xp": 10 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "user_id is required");
}

#[tokio::test]
async fn test_change_level_moves_xp_to_next_band() {
    let backend = Arc::new(MemoryBackend::default().with_profile("ada", "ada", 150, 2));

    let request = Request::post("/api/changeLevel")
        .header(AUTHORIZATION, format!("Bearer {}", token_for("ada")))
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(app(backend.clone()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["level"], 3);
    assert_eq!(body["xp"], 200);
    assert_eq!(body["progress"]["progress_percentage"], 0.0);

    let profile = backend.profile("ada");
    assert_eq!(profile.xp, 200);
    assert_eq!(profile.level, 3);
}

#[tokio::test]
async fn test_change_level_requires_token() {
    let request = Request::post("/api/changeLevel")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(app(Arc::default()), request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authorization bearer token is required");
}

#[tokio::test]
async fn test_change_level_rejected_token_is_unauthorized() {
    let backend = Arc::new(MemoryBackend::default().with_profile("ada", "ada", 150, 2));

    let request = Request::post("/api/changeLevel")
        .header(AUTHORIZATION, "Bearer expired")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(app(backend.clone()), request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid JWT");
    assert_eq!(backend.profile("ada").xp, 150);
}

#[tokio::test]
async fn test_leaderboard_orders_and_derives_level() {
    let mut backend = MemoryBackend::default();
    for (i, xp) in [40, 990, 310, 0, 120, 500, 75, 860, 205, 15, 640, 999].iter().enumerate() {
        backend = backend.with_profile(&format!("p{i}"), &format!("player {i}"), *xp, 1);
    }

    let (status, body) = send(app(Arc::new(backend)), get("/api/leaderboard")).await;

    assert_eq!(status, StatusCode::OK);

    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 10);

    let xps: Vec<i64> = entries.iter().map(|e| e["xp"].as_i64().unwrap()).collect();
    assert!(xps.windows(2).all(|pair| pair[0] >= pair[1]));

    assert_eq!(entries[0]["xp"], 999);
    assert_eq!(entries[0]["level"], 10);
    assert_eq!(entries[0]["username"], "player 11");
}
