use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::{Bool, Text};
use thiserror::Error;

use crate::ai::{GeminiService, QuizQuestion};
use crate::model::{NewQuizAttempt, QuizAttempt, User};
use crate::schema::quiz_attempts;
use crate::streak;

#[derive(Error, Debug)]
pub enum QuizError {
    #[error("Database error")]
    Database(#[from] DieselError),
    #[error("Stored quiz data is not valid JSON: {0}")]
    InvalidQuizData(#[from] serde_json::Error),
}

/// Returns the quiz questions for (`user_id`, `word`) on the current day,
/// generating and persisting them on first request. Concurrent creation is
/// resolved the same way as for daily words: the losing insert re-reads and
/// returns the winner's questions.
pub async fn get_or_create_quiz(
    conn: &mut SqliteConnection,
    ai: &GeminiService,
    user_id: i32,
    word: &str,
    now: NaiveDateTime,
) -> Result<Vec<QuizQuestion>, QuizError> {
    if let Some(attempt) = find_attempt_for_day(conn, user_id, word, now.date())? {
        return Ok(serde_json::from_str(&attempt.quiz_questions)?);
    }

    let questions = ai.generate_quiz_questions(word).await;
    store_quiz_attempt(conn, user_id, word, &questions, now)
}

/// Looks up the quiz attempt for `word` whose `date_attempted` falls on `day`.
pub fn find_attempt_for_day(
    conn: &mut SqliteConnection,
    user_id: i32,
    word: &str,
    day: NaiveDate,
) -> Result<Option<QuizAttempt>, DieselError> {
    quiz_attempts::table
        .filter(quiz_attempts::user_id.eq(user_id))
        .filter(quiz_attempts::word.eq(word))
        .filter(sql::<Bool>("date(date_attempted) = ").bind::<Text, _>(day.to_string()))
        .first::<QuizAttempt>(conn)
        .optional()
}

pub fn store_quiz_attempt(
    conn: &mut SqliteConnection,
    user_id: i32,
    word: &str,
    questions: &[QuizQuestion],
    now: NaiveDateTime,
) -> Result<Vec<QuizQuestion>, QuizError> {
    let questions_json = serde_json::to_string(questions)?;

    let inserted = diesel::insert_into(quiz_attempts::table)
        .values(&NewQuizAttempt {
            user_id,
            word,
            quiz_questions: &questions_json,
            date_attempted: now,
        })
        .execute(conn);

    match inserted {
        Ok(_) => Ok(questions.to_vec()),
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info)) => {
            log::info!("Concurrent request already stored a quiz for user {} / '{}'", user_id, word);
            match find_attempt_for_day(conn, user_id, word, now.date())? {
                Some(attempt) => Ok(serde_json::from_str(&attempt.quiz_questions)?),
                None => {
                    Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info).into())
                }
            }
        }
        Err(e) => Err(e.into()),
    }
}

/// Percentage of questions answered correctly, 0-100.
///
/// Answers are keyed by the literal question text and compared against the
/// stored correct answer with exact string equality. No questions or no
/// answers at all scores 0.
pub fn calculate_quiz_score(questions: &[QuizQuestion], answers: &HashMap<String, String>) -> f64 {
    if questions.is_empty() || answers.is_empty() {
        return 0.0;
    }

    let correct = questions
        .iter()
        .filter(|q| answers.get(&q.question).map(String::as_str) == Some(q.correct_answer.as_str()))
        .count();

    (correct as f64 / questions.len() as f64) * 100.0
}

/// Scores the submitted answers against today's stored quiz for `word`.
///
/// Returns `Ok(None)` when no attempt exists for (`user`, `word`) today.
/// Otherwise writes the answers and recomputed score onto the attempt and
/// updates the user's learning streak in the same transaction; resubmission
/// overwrites the previous answers and score.
pub fn submit_quiz(
    conn: &mut SqliteConnection,
    user: &User,
    word: &str,
    now: NaiveDateTime,
    answers: &HashMap<String, String>,
) -> Result<Option<f64>, QuizError> {
    let attempt = match find_attempt_for_day(conn, user.id, word, now.date())? {
        Some(attempt) => attempt,
        None => return Ok(None),
    };

    let questions: Vec<QuizQuestion> = serde_json::from_str(&attempt.quiz_questions)?;
    let score = calculate_quiz_score(&questions, answers);
    let answers_json = serde_json::to_string(answers)?;

    conn.transaction::<_, DieselError, _>(|conn| {
        diesel::update(quiz_attempts::table.find(attempt.id))
            .set((
                quiz_attempts::user_answers.eq(&answers_json),
                quiz_attempts::score.eq(score),
            ))
            .execute(conn)?;

        streak::record_activity(conn, user, now)?;
        Ok(())
    })?;

    Ok(Some(score))
}
