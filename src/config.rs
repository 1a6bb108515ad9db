use std::env;

pub const DEV_SECRET_KEY: &str = "your-very-secret-key";

/// Application settings, loaded once at startup from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub secret_key: String,
    pub database_url: String,
    pub gemini_api_key: Option<String>,
    pub default_user_interests: String,
    pub default_word_difficulty: String,
    pub remember_cookie_days: i64,
    pub session_cookie_secure: bool,
    pub csrf_enabled: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            secret_key: env::var("SECRET_KEY").unwrap_or_else(|_| DEV_SECRET_KEY.into()),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://vocabulary_enhancer.db".into()),
            gemini_api_key: env::var("GEMINI_API_KEY").ok(),
            default_user_interests: env::var("DEFAULT_USER_INTERESTS")
                .unwrap_or_else(|_| "general knowledge".into()),
            default_word_difficulty: env::var("DEFAULT_WORD_DIFFICULTY")
                .unwrap_or_else(|_| "intermediate".into()),
            remember_cookie_days: parse_var("REMEMBER_COOKIE_DAYS", 7),
            session_cookie_secure: parse_var("SESSION_COOKIE_SECURE", true),
            csrf_enabled: parse_var("CSRF_ENABLED", true),
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!("Invalid value for {}, using default", key);
            default
        }),
        Err(_) => default,
    }
}
