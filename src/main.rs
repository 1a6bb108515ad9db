use std::sync::Arc;

use axum::{
    response::Redirect,
    routing::{get, get_service},
    Router,
};
use tera::Tera;
use time::Duration;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};

mod ai;
mod auth;
mod config;
mod dashboard;
mod db;
mod login;
mod model;
mod quiz;
mod register;
mod schema;
mod streak;
mod utils;
mod words;

use crate::{ai::GeminiService, config::Config, db::DbPool};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub templates: Arc<Tera>,
    pub config: Arc<Config>,
    pub ai: Option<Arc<GeminiService>>,
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Config::from_env();
    if config.secret_key == config::DEV_SECRET_KEY {
        log::warn!("SECRET_KEY is not set; sessions use the development default");
    }
    if !config.csrf_enabled {
        log::warn!("CSRF protection is disabled");
    }

    // Database configuration
    let pool = match db::init(&config.database_url) {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Database initialization error: {}", e);
            std::process::exit(1);
        }
    };

    // AI service configuration
    let ai = match config.gemini_api_key.as_deref() {
        Some(key) => match GeminiService::new(key) {
            Ok(service) => Some(Arc::new(service)),
            Err(e) => {
                log::warn!("AI service disabled: {}", e);
                None
            }
        },
        None => {
            log::warn!("GEMINI_API_KEY is not set; AI features are disabled");
            None
        }
    };

    // Templates configuration
    let templates = match Tera::new("templates/**/*.html") {
        Ok(t) => Arc::new(t),
        Err(e) => {
            eprintln!("Template parsing error: {}", e);
            std::process::exit(1);
        }
    };

    // Sessions configuration
    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_expiry(Expiry::OnInactivity(Duration::days(config.remember_cookie_days)))
        .with_secure(config.session_cookie_secure);

    let state = AppState {
        pool,
        templates,
        config: Arc::new(config),
        ai,
    };

    // Main application router
    let app = Router::new()
        .route("/", get(index))
        .merge(login::auth_router(state.clone()))
        .merge(register::auth_router(state.clone()))
        .merge(dashboard::dashboard_router(state.clone()))
        .nest_service("/static", get_service(ServeDir::new("static")))
        .layer(session_layer);

    // Start server
    let listener = match TcpListener::bind("127.0.0.1:5000").await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to address: {}", e);
            std::process::exit(1);
        }
    };

    println!("Server running on http://localhost:5000");

    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn index(session: Session) -> Redirect {
    if utils::is_logged_in(&session).await {
        Redirect::to("/dashboard")
    } else {
        Redirect::to("/login")
    }
}
