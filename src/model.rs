use chrono::NaiveDateTime;
use diesel::{Insertable, Queryable, Selectable};
use serde::Serialize;

use crate::schema::{daily_words, quiz_attempts, users};

#[derive(Debug, Queryable, Selectable, Serialize)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub interests: Option<String>,
    pub preferred_difficulty: Option<String>,
    pub learning_streak: i32,
    pub last_activity_date: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
}

#[derive(Debug, Queryable, Selectable, Serialize)]
#[diesel(table_name = daily_words)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DailyWord {
    pub id: i32,
    pub user_id: i32,
    pub word: String,
    pub meaning: String,
    pub synonyms: Option<String>,
    pub antonyms: Option<String>,
    pub example_sentence: Option<String>,
    pub rephrased_meaning: Option<String>,
    pub date_learned: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = daily_words)]
pub struct NewDailyWord<'a> {
    pub user_id: i32,
    pub word: &'a str,
    pub meaning: &'a str,
    pub synonyms: &'a str,
    pub antonyms: &'a str,
    pub example_sentence: &'a str,
    pub rephrased_meaning: &'a str,
    pub date_learned: NaiveDateTime,
}

#[derive(Debug, Queryable, Selectable, Serialize)]
#[diesel(table_name = quiz_attempts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct QuizAttempt {
    pub id: i32,
    pub user_id: i32,
    pub word: String,
    pub quiz_questions: String,
    pub user_answers: Option<String>,
    pub score: Option<f64>,
    pub date_attempted: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = quiz_attempts)]
pub struct NewQuizAttempt<'a> {
    pub user_id: i32,
    pub word: &'a str,
    pub quiz_questions: &'a str,
    pub date_attempted: NaiveDateTime,
}
