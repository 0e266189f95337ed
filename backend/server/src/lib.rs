//! Documentation of the Quest learning game backend.
//!
//!
//!
//! # General Infrastructure
//! - Frontend talks to this server only, never to Supabase directly
//! - This server holds the anon key and forwards each call to Supabase auth or the `profiles` table
//! - No local persistence, no caching, nothing to migrate
//! - Every XP write also writes the derived level, see the `progress` crate
//!
//!
//!
//! # Routes
//!
//! | Method | Path               | Upstream calls                         |
//! |--------|--------------------|----------------------------------------|
//! | GET    | `/`                | none                                   |
//! | POST   | `/api/signup`      | auth signup, profile insert            |
//! | POST   | `/api/login`       | auth password grant                    |
//! | GET    | `/api/profile`     | profile select                         |
//! | POST   | `/api/addxp`       | profile select, profile update         |
//! | POST   | `/api/changeLevel` | auth user, profile select, update      |
//! | GET    | `/api/leaderboard` | profile select ordered by xp           |
//!
//! Errors always come back as `{"error": "..."}`.
//!
//!
//!
//! # Levels
//!
//! Level is never stored on its own. `/api/changeLevel` moves XP to the start
//! of the next band and writes both, so the two columns cannot drift apart.
//!
//!
//!
//! # Setup
//!
//! Environment.
//! ```sh
//! export SUPABASE_URL=https://<project>.supabase.co
//! export SUPABASE_ANON_KEY=<key>   # or /run/secrets/SUPABASE_ANON_KEY
//! export RUST_LOG=info
//! ```
//!
//! Run.
//! ```sh
//! cargo run -p quest
//! ```
//!
//! Check a running server.
//! ```sh
//! cargo run -p tester -- sync --base-url http://127.0.0.1:5000
//! ```
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, post},
};

use signal::ctrl_c;
#[cfg(unix)]
use signal::unix::{SignalKind, signal};
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;
pub mod supabase;
pub mod utils;

use config::Config;
use routes::{
    add_xp_handler, change_level_handler, home_handler, leaderboard_handler, login_handler,
    profile_handler, signup_handler,
};
use state::State;

pub fn router(state: Arc<State>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/", get(home_handler))
        .route("/api/signup", post(signup_handler))
        .route("/api/login", post(login_handler))
        .route("/api/profile", get(profile_handler))
        .route("/api/addxp", post(add_xp_handler))
        .route("/api/changeLevel", post(change_level_handler))
        .route("/api/leaderboard", get(leaderboard_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = State::new(config)?;

    info!("Starting server...");

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
