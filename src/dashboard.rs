use std::collections::HashMap;

use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use serde::{Deserialize, Serialize};
use tera::Context;
use thiserror::Error;
use tower_sessions::Session;

use crate::{
    ai::{QuizQuestion, WordData},
    model::{DailyWord, QuizAttempt},
    quiz::{self, QuizError},
    schema::{daily_words, quiz_attempts, users},
    utils::{current_user, flash, render_template, take_flashes},
    words, AppState,
};

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Database connection error")]
    Pool(#[from] r2d2::Error),
    #[error("Database error")]
    Database(#[from] DieselError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        log::error!("Dashboard request failed: {}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
    }
}

#[derive(Serialize)]
struct WordHistoryEntry {
    word: String,
    meaning: String,
    date_learned: String,
}

#[derive(Serialize)]
struct AttemptHistoryEntry {
    word: String,
    score: Option<f64>,
    date_attempted: String,
}

pub async fn dashboard(
    State(state): State<AppState>,
    session: Session,
) -> Result<Response, DashboardError> {
    let mut conn = state.pool.get()?;
    let user = match current_user(&mut conn, &session).await {
        Some(user) => user,
        None => return Ok(Redirect::to("/login").into_response()),
    };

    // The AI service is constructed once at startup; when that failed the
    // dashboard still renders, minus the word and quiz content.
    let ai = match &state.ai {
        Some(ai) => ai.clone(),
        None => {
            flash(
                &session,
                "error",
                "AI service is currently unavailable. Please try again later.",
            )
            .await;
            return Ok(dashboard_shell(&state, &session, user.learning_streak).await);
        }
    };

    let now = Utc::now().naive_utc();

    let word_data =
        match words::get_or_create_daily_word(&mut conn, &ai, &state.config, &user, now).await {
            Ok(word_data) => word_data,
            Err(e) => {
                log::error!("Failed to prepare daily word for user {}: {}", user.id, e);
                flash(&session, "error", "Error generating daily word. Please try again later.")
                    .await;
                return Ok(dashboard_shell(&state, &session, user.learning_streak).await);
            }
        };

    let quiz_questions =
        match quiz::get_or_create_quiz(&mut conn, &ai, user.id, &word_data.word, now).await {
            Ok(questions) => Some(questions),
            Err(e) => {
                log::error!("Failed to prepare quiz for user {}: {}", user.id, e);
                flash(&session, "error", "Error generating quiz questions. Please try again later.")
                    .await;
                None
            }
        };

    let attempt = quiz::find_attempt_for_day(&mut conn, user.id, &word_data.word, now.date())?;
    let (current_quiz_completed, quiz_score) = match &attempt {
        Some(attempt) if attempt.score.is_some() => (true, attempt.score),
        _ => (false, None),
    };

    let previous_words: Vec<DailyWord> = daily_words::table
        .filter(daily_words::user_id.eq(user.id))
        .order_by(daily_words::date_learned.desc())
        .limit(10)
        .load(&mut conn)?;
    let quiz_history: Vec<QuizAttempt> = quiz_attempts::table
        .filter(quiz_attempts::user_id.eq(user.id))
        .order_by(quiz_attempts::date_attempted.desc())
        .limit(5)
        .load(&mut conn)?;

    let mut context = Context::new();
    context.insert("title", "Dashboard");
    context.insert("flashes", &take_flashes(&session).await);
    context.insert("word_data", &word_data);
    context.insert("quiz_questions", &quiz_questions);
    context.insert("previous_words", &word_history(&previous_words));
    context.insert("quiz_history", &attempt_history(&quiz_history));
    context.insert("learning_streak", &user.learning_streak);
    context.insert("current_quiz_completed", &current_quiz_completed);
    context.insert("quiz_score", &quiz_score);
    Ok(render_template(&state.templates, "dashboard.html", context).into_response())
}

#[axum::debug_handler]
pub async fn handle_submit_quiz(
    State(state): State<AppState>,
    session: Session,
    Form(mut form): Form<HashMap<String, String>>,
) -> Result<Redirect, DashboardError> {
    let mut conn = state.pool.get()?;
    let user = match current_user(&mut conn, &session).await {
        Some(user) => user,
        None => return Ok(Redirect::to("/login")),
    };

    // The remaining form fields are the answers, keyed by question text.
    let word = match form.remove("word") {
        Some(word) => word,
        None => return Ok(Redirect::to("/dashboard")),
    };

    let now = Utc::now().naive_utc();
    if let Some(score) = quiz::submit_quiz(&mut conn, &user, &word, now, &form)? {
        flash(
            &session,
            "message",
            &format!("Quiz submitted! Your score: {:.1}%", score),
        )
        .await;
    }

    Ok(Redirect::to("/dashboard"))
}

#[derive(Debug, Deserialize)]
pub struct SettingsForm {
    pub interests: String,
    pub difficulty: String,
}

pub async fn show_settings(
    State(state): State<AppState>,
    session: Session,
) -> Result<Response, DashboardError> {
    let mut conn = state.pool.get()?;
    let user = match current_user(&mut conn, &session).await {
        Some(user) => user,
        None => return Ok(Redirect::to("/login").into_response()),
    };

    let mut context = Context::new();
    context.insert("title", "Settings");
    context.insert("flashes", &take_flashes(&session).await);
    context.insert("username", &user.username);
    context.insert("interests", &user.interests.as_deref().unwrap_or(""));
    context.insert("difficulty", &user.preferred_difficulty.as_deref().unwrap_or(""));
    Ok(render_template(&state.templates, "settings.html", context).into_response())
}

#[axum::debug_handler]
pub async fn handle_settings(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SettingsForm>,
) -> Result<Redirect, DashboardError> {
    let mut conn = state.pool.get()?;
    let user = match current_user(&mut conn, &session).await {
        Some(user) => user,
        None => return Ok(Redirect::to("/login")),
    };

    update_preferences(&mut conn, user.id, &form.interests, &form.difficulty)?;

    flash(&session, "message", "Settings updated successfully!").await;
    Ok(Redirect::to("/dashboard"))
}

/// Writes both preference fields as given, including empty strings; the
/// configured defaults are applied at word-generation time, not here.
pub fn update_preferences(
    conn: &mut SqliteConnection,
    user_id: i32,
    interests: &str,
    difficulty: &str,
) -> Result<(), DieselError> {
    diesel::update(users::table.find(user_id))
        .set((
            users::interests.eq(interests),
            users::preferred_difficulty.eq(difficulty),
        ))
        .execute(conn)?;
    Ok(())
}

// Renders the dashboard with no word or quiz content, shown when the AI
// service is unavailable or word creation failed.
async fn dashboard_shell(state: &AppState, session: &Session, learning_streak: i32) -> Response {
    let mut context = Context::new();
    context.insert("title", "Dashboard");
    context.insert("flashes", &take_flashes(session).await);
    context.insert("word_data", &Option::<WordData>::None);
    context.insert("quiz_questions", &Option::<Vec<QuizQuestion>>::None);
    context.insert("previous_words", &Vec::<WordHistoryEntry>::new());
    context.insert("quiz_history", &Vec::<AttemptHistoryEntry>::new());
    context.insert("learning_streak", &learning_streak);
    context.insert("current_quiz_completed", &false);
    context.insert("quiz_score", &Option::<f64>::None);
    render_template(&state.templates, "dashboard.html", context).into_response()
}

fn word_history(rows: &[DailyWord]) -> Vec<WordHistoryEntry> {
    rows.iter()
        .map(|row| WordHistoryEntry {
            word: row.word.clone(),
            meaning: row.meaning.clone(),
            date_learned: row.date_learned.format("%Y-%m-%d").to_string(),
        })
        .collect()
}

fn attempt_history(rows: &[QuizAttempt]) -> Vec<AttemptHistoryEntry> {
    rows.iter()
        .map(|row| AttemptHistoryEntry {
            word: row.word.clone(),
            score: row.score,
            date_attempted: row.date_attempted.format("%Y-%m-%d").to_string(),
        })
        .collect()
}

pub fn dashboard_router(state: AppState) -> Router {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/submit_quiz", post(handle_submit_quiz))
        .route("/settings", get(show_settings).post(handle_settings))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::model::{NewUser, User};
    use chrono::NaiveDate;

    fn test_conn() -> SqliteConnection {
        let mut conn = SqliteConnection::establish(":memory:").unwrap();
        db::init_schema(&mut conn).unwrap();
        conn
    }

    fn insert_user(conn: &mut SqliteConnection) -> i32 {
        diesel::insert_into(users::table)
            .values(&NewUser {
                username: "dana",
                email: "dana@example.com",
                password_hash: "not-a-real-hash",
            })
            .execute(conn)
            .unwrap();
        users::table
            .select(users::id)
            .order(users::id.desc())
            .first(conn)
            .unwrap()
    }

    #[test]
    fn preference_update_persists_both_fields() {
        let mut conn = test_conn();
        let user_id = insert_user(&mut conn);

        update_preferences(&mut conn, user_id, "science, travel", "advanced").unwrap();

        let user: User = users::table.find(user_id).first(&mut conn).unwrap();
        assert_eq!(user.interests.as_deref(), Some("science, travel"));
        assert_eq!(user.preferred_difficulty.as_deref(), Some("advanced"));
    }

    #[test]
    fn preference_update_accepts_empty_values() {
        let mut conn = test_conn();
        let user_id = insert_user(&mut conn);

        update_preferences(&mut conn, user_id, "", "").unwrap();

        let user: User = users::table.find(user_id).first(&mut conn).unwrap();
        assert_eq!(user.interests.as_deref(), Some(""));
        assert_eq!(user.preferred_difficulty.as_deref(), Some(""));
    }

    #[test]
    fn history_entries_format_the_calendar_day() {
        let learned = NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let words = [DailyWord {
            id: 1,
            user_id: 1,
            word: "ephemeral".into(),
            meaning: "lasting a very short time".into(),
            synonyms: None,
            antonyms: None,
            example_sentence: None,
            rephrased_meaning: None,
            date_learned: learned,
        }];
        let attempts = [QuizAttempt {
            id: 1,
            user_id: 1,
            word: "ephemeral".into(),
            quiz_questions: "[]".into(),
            user_answers: None,
            score: Some(66.7),
            date_attempted: learned,
        }];

        let word_entries = word_history(&words);
        assert_eq!(word_entries[0].date_learned, "2024-03-10");

        let attempt_entries = attempt_history(&attempts);
        assert_eq!(attempt_entries[0].date_attempted, "2024-03-10");
        assert_eq!(attempt_entries[0].score, Some(66.7));
    }
}
