use chrono::{NaiveDate, NaiveDateTime};
use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::{Bool, Text};
use thiserror::Error;

use crate::ai::{GeminiService, QuizQuestion, WordData};
use crate::config::Config;
use crate::model::{DailyWord, NewDailyWord, NewQuizAttempt, User};
use crate::schema::{daily_words, quiz_attempts};

#[derive(Error, Debug)]
pub enum WordsError {
    #[error("Database error")]
    Database(#[from] DieselError),
    #[error("Failed to serialize quiz questions: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Returns the word of the day for `user`, creating it if this is the first
/// request of the calendar day.
///
/// Creation asks the AI service for a word matching the user's interests and
/// difficulty (falling back to the configured defaults when unset), then
/// persists the word together with its quiz attempt in one transaction. When
/// a concurrent request wins the insert, the winner's row is returned.
pub async fn get_or_create_daily_word(
    conn: &mut SqliteConnection,
    ai: &GeminiService,
    config: &Config,
    user: &User,
    now: NaiveDateTime,
) -> Result<WordData, WordsError> {
    if let Some(row) = find_word_for_day(conn, user.id, now.date())? {
        return Ok(word_data_from_row(&row));
    }

    let interests = non_empty_or(user.interests.as_deref(), &config.default_user_interests);
    let difficulty = non_empty_or(
        user.preferred_difficulty.as_deref(),
        &config.default_word_difficulty,
    );

    let word_data = ai.generate_daily_word(interests, difficulty).await;
    let questions = ai.generate_quiz_questions(&word_data.word).await;

    log::info!("Generated daily word '{}' for user {}", word_data.word, user.id);
    store_daily_word(conn, user.id, &word_data, &questions, now)
}

/// Looks up the daily word whose `date_learned` falls on `day`.
pub fn find_word_for_day(
    conn: &mut SqliteConnection,
    user_id: i32,
    day: NaiveDate,
) -> Result<Option<DailyWord>, DieselError> {
    daily_words::table
        .filter(daily_words::user_id.eq(user_id))
        .filter(sql::<Bool>("date(date_learned) = ").bind::<Text, _>(day.to_string()))
        .first::<DailyWord>(conn)
        .optional()
}

/// Persists a new daily word and its quiz attempt atomically.
///
/// The unique index on (user_id, day) makes a concurrent double-insert roll
/// back; on that conflict the already-stored word is read back and returned,
/// so callers always observe exactly one word per day.
pub fn store_daily_word(
    conn: &mut SqliteConnection,
    user_id: i32,
    word_data: &WordData,
    questions: &[QuizQuestion],
    now: NaiveDateTime,
) -> Result<WordData, WordsError> {
    let synonyms = join_word_list(&word_data.synonyms);
    let antonyms = join_word_list(&word_data.antonyms);
    let questions_json = serde_json::to_string(questions)?;

    let inserted = conn.transaction::<_, DieselError, _>(|conn| {
        diesel::insert_into(daily_words::table)
            .values(&NewDailyWord {
                user_id,
                word: &word_data.word,
                meaning: &word_data.meaning,
                synonyms: &synonyms,
                antonyms: &antonyms,
                example_sentence: &word_data.example_sentence,
                rephrased_meaning: &word_data.rephrased_meaning,
                date_learned: now,
            })
            .execute(conn)?;

        diesel::insert_into(quiz_attempts::table)
            .values(&NewQuizAttempt {
                user_id,
                word: &word_data.word,
                quiz_questions: &questions_json,
                date_attempted: now,
            })
            .execute(conn)?;

        Ok(())
    });

    match inserted {
        Ok(()) => Ok(word_data.clone()),
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info)) => {
            log::info!("Concurrent request already stored today's word for user {}", user_id);
            match find_word_for_day(conn, user_id, now.date())? {
                Some(row) => Ok(word_data_from_row(&row)),
                None => Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info).into()),
            }
        }
        Err(e) => Err(e.into()),
    }
}

fn word_data_from_row(row: &DailyWord) -> WordData {
    WordData {
        word: row.word.clone(),
        meaning: row.meaning.clone(),
        synonyms: split_word_list(row.synonyms.as_deref().unwrap_or("")),
        antonyms: split_word_list(row.antonyms.as_deref().unwrap_or("")),
        example_sentence: row.example_sentence.clone().unwrap_or_default(),
        rephrased_meaning: row.rephrased_meaning.clone().unwrap_or_default(),
    }
}

pub fn join_word_list(items: &[String]) -> String {
    items.join(", ")
}

/// Inverse of `join_word_list`. The empty string maps back to the empty
/// list rather than `[""]`.
pub fn split_word_list(stored: &str) -> Vec<String> {
    if stored.is_empty() {
        Vec::new()
    } else {
        stored.split(", ").map(str::to_string).collect()
    }
}

fn non_empty_or<'a>(value: Option<&'a str>, default: &'a str) -> &'a str {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::model::NewUser;
    use crate::schema::users;
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

    fn sample_word(name: &str) -> WordData {
        WordData {
            word: name.to_string(),
            meaning: format!("meaning of {name}"),
            synonyms: vec!["luck".into(), "fortune".into()],
            antonyms: vec!["misfortune".into()],
            example_sentence: format!("A sentence with {name}."),
            rephrased_meaning: format!("{name}, but simpler"),
        }
    }

    fn sample_quiz() -> Vec<QuizQuestion> {
        vec![QuizQuestion {
            question: "Q1".into(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_answer: "a".into(),
        }]
    }

    fn noon(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn word_lists_round_trip() {
        let list = vec!["luck".to_string(), "fortune".to_string()];
        assert_eq!(split_word_list(&join_word_list(&list)), list);
    }

    #[test]
    fn empty_word_list_round_trips_to_empty() {
        let empty: Vec<String> = Vec::new();
        let stored = join_word_list(&empty);
        assert_eq!(stored, "");
        assert_eq!(split_word_list(&stored), empty);
    }

    #[test]
    fn stored_word_is_found_on_the_same_day() {
        let mut conn = test_conn();
        let user_id = insert_user(&mut conn);
        let now = noon(2024, 3, 10);

        let stored = store_daily_word(&mut conn, user_id, &sample_word("ephemeral"), &sample_quiz(), now)
            .unwrap();
        assert_eq!(stored.word, "ephemeral");

        let found = find_word_for_day(&mut conn, user_id, now.date()).unwrap().unwrap();
        assert_eq!(found.word, "ephemeral");
        assert_eq!(found.synonyms.as_deref(), Some("luck, fortune"));

        // Not visible on another day.
        let other_day = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap();
        assert!(find_word_for_day(&mut conn, user_id, other_day).unwrap().is_none());
    }

    #[test]
    fn second_store_on_the_same_day_returns_the_existing_word() {
        let mut conn = test_conn();
        let user_id = insert_user(&mut conn);
        let now = noon(2024, 3, 10);

        store_daily_word(&mut conn, user_id, &sample_word("first"), &sample_quiz(), now).unwrap();
        let second =
            store_daily_word(&mut conn, user_id, &sample_word("second"), &sample_quiz(), now)
                .unwrap();

        // The loser of the race gets the winner's word back.
        assert_eq!(second.word, "first");

        let count: i64 = daily_words::table
            .filter(daily_words::user_id.eq(user_id))
            .count()
            .get_result(&mut conn)
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn store_creates_the_matching_quiz_attempt_atomically() {
        let mut conn = test_conn();
        let user_id = insert_user(&mut conn);
        let now = noon(2024, 3, 10);

        store_daily_word(&mut conn, user_id, &sample_word("ephemeral"), &sample_quiz(), now).unwrap();

        let (word, questions_json): (String, String) = quiz_attempts::table
            .filter(quiz_attempts::user_id.eq(user_id))
            .select((quiz_attempts::word, quiz_attempts::quiz_questions))
            .first(&mut conn)
            .unwrap();
        assert_eq!(word, "ephemeral");

        let questions: Vec<QuizQuestion> = serde_json::from_str(&questions_json).unwrap();
        assert_eq!(questions, sample_quiz());
    }

    #[test]
    fn conflicting_store_does_not_duplicate_the_quiz_attempt() {
        let mut conn = test_conn();
        let user_id = insert_user(&mut conn);
        let now = noon(2024, 3, 10);

        store_daily_word(&mut conn, user_id, &sample_word("first"), &sample_quiz(), now).unwrap();
        store_daily_word(&mut conn, user_id, &sample_word("second"), &sample_quiz(), now).unwrap();

        let count: i64 = quiz_attempts::table
            .filter(quiz_attempts::user_id.eq(user_id))
            .count()
            .get_result(&mut conn)
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn words_on_different_days_both_persist() {
        let mut conn = test_conn();
        let user_id = insert_user(&mut conn);

        store_daily_word(&mut conn, user_id, &sample_word("first"), &sample_quiz(), noon(2024, 3, 10))
            .unwrap();
        store_daily_word(&mut conn, user_id, &sample_word("second"), &sample_quiz(), noon(2024, 3, 11))
            .unwrap();

        let count: i64 = daily_words::table
            .filter(daily_words::user_id.eq(user_id))
            .count()
            .get_result(&mut conn)
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn empty_synonym_list_survives_storage() {
        let mut conn = test_conn();
        let user_id = insert_user(&mut conn);
        let now = noon(2024, 3, 10);

        let mut word = sample_word("laconic");
        word.synonyms.clear();
        word.antonyms.clear();
        store_daily_word(&mut conn, user_id, &word, &sample_quiz(), now).unwrap();

        let row = find_word_for_day(&mut conn, user_id, now.date()).unwrap().unwrap();
        let restored = word_data_from_row(&row);
        assert!(restored.synonyms.is_empty());
        assert!(restored.antonyms.is_empty());
    }
}
