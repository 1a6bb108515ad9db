use anyhow::Context;
use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::SqliteConnection;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

// Mirrors schema.rs. The unique indexes on the calendar day of the stored
// timestamp guarantee at most one daily word per (user, day) and one quiz
// attempt per (user, word, day) even under concurrent first requests.
const SCHEMA_DDL: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    interests TEXT,
    preferred_difficulty TEXT,
    learning_streak INTEGER NOT NULL DEFAULT 0,
    last_activity_date TIMESTAMP
);
CREATE TABLE IF NOT EXISTS daily_words (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users (id),
    word TEXT NOT NULL,
    meaning TEXT NOT NULL,
    synonyms TEXT,
    antonyms TEXT,
    example_sentence TEXT,
    rephrased_meaning TEXT,
    date_learned TIMESTAMP NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS daily_words_user_day
    ON daily_words (user_id, date(date_learned));
CREATE TABLE IF NOT EXISTS quiz_attempts (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users (id),
    word TEXT NOT NULL,
    quiz_questions TEXT NOT NULL,
    user_answers TEXT,
    score REAL,
    date_attempted TIMESTAMP NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS quiz_attempts_user_word_day
    ON quiz_attempts (user_id, word, date(date_attempted));
";

/// Builds the connection pool and applies the schema to the target database.
pub fn init(database_url: &str) -> anyhow::Result<DbPool> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = Pool::builder()
        .build(manager)
        .context("Failed to create DB pool")?;

    let mut conn = pool
        .get()
        .context("Failed to get a connection for schema setup")?;
    init_schema(&mut conn).context("Failed to apply database schema")?;

    Ok(pool)
}

pub fn init_schema(conn: &mut SqliteConnection) -> diesel::QueryResult<()> {
    conn.batch_execute(SCHEMA_DDL)
}
