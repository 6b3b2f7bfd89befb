use rusqlite::{Connection, Params, Row, ffi};
use r2d2_sqlite::SqliteConnectionManager;
use derive_more::Display;
use eyre::WrapErr;
use color_eyre::{Report, Result};

pub mod entities;
pub mod mappers;
pub mod helpers;
pub mod queries;
pub mod accounts;
pub mod engagement;
pub mod links;
pub mod posts;
pub mod soccer;

pub use accounts::*;
pub use engagement::*;
pub use links::*;
pub use posts::*;
pub use soccer::*;

// Type alias to make function signatures much clearer:
pub type Pool = r2d2::Pool<SqliteConnectionManager>;

const SCHEMA: &'static str = include_str!("schema.sql");

/**
 * All the DB stuff is done in a non-async way, the
 * handlers call these directly.
 */

// SQLite has foreign keys disabled by default, and it's
// a per connection setting. The cascades in the schema
// depend on it.
fn init_connection(conn: &mut Connection) -> Result<(), rusqlite::Error> {
  conn.execute_batch("PRAGMA foreign_keys = ON;")
}

pub fn open_pool(db_path: &str) -> Result<Pool> {
  let manager = SqliteConnectionManager::file(db_path)
    .with_init(init_connection);
  let pool = r2d2::Pool::new(manager)
    .context(format!("Opening database at {}", db_path))?;
  init_schema(&pool)?;
  Ok(pool)
}

// Creates whatever table is missing.
pub fn init_schema(pool: &Pool) -> Result<()> {
  let conn = pool.get()?;
  conn.execute_batch(SCHEMA)
    .context("Creating the database schema")
}

// In memory database for the tests. There can only be one
// connection, every connection to ":memory:" is its own
// separate database.
#[cfg(test)]
pub fn test_pool() -> Pool {
  let manager = SqliteConnectionManager::memory()
    .with_init(init_connection);
  let pool = r2d2::Pool::builder()
    .max_size(1)
    .connection_timeout(std::time::Duration::from_secs(2))
    .build(manager)
    .expect("in-memory pool");
  init_schema(&pool).expect("schema");
  pool
}

// Stole most of the signature from the rusqlite doc.
// Careful to use a later version of the crate,
// Google takes you to old versions of the doc.
pub fn select_many<T, P, F>(
  pool: &Pool,
  query: &str,
  params: P,
  mapper: F
) -> Result<Vec<T>>
  where
    P: Params,
    F: FnMut(&Row<'_>) -> Result<T, rusqlite::Error>,
{
  let conn = pool.get()?;
  let mut stmt = conn.prepare(query)?;
  let rows = stmt.query_map(params, mapper)
    .and_then(Iterator::collect)
    .context("Generic select_many query");
  rows
}

// Same thing for a single row, None if there's nothing.
pub fn select_one<T, P, F>(
  pool: &Pool,
  query: &str,
  params: P,
  mapper: F
) -> Result<Option<T>>
  where
    P: Params,
    F: FnOnce(&Row<'_>) -> Result<T, rusqlite::Error>,
{
  let conn = pool.get()?;
  let mut stmt = conn.prepare(query)?;
  let mut rows = stmt.query(params)?;
  let row = rows.next().context("Generic select_one query")?;
  let result = match row {
    Some(row) => Some(mapper(row)?),
    None => None
  };
  Ok(result)
}

pub fn count(pool: &Pool, query: &str, params: impl Params) -> Result<usize> {
  let conn = pool.get()?;
  let count: i64 = conn.query_row(query, params, |row| row.get(0))
    .context("Generic count query")?;
  Ok(count.max(0) as usize)
}

// Writes can fail for reasons the forms have to show to
// the user, these get their own variants. Anything else
// is a Database error and ends up as a 500.
#[derive(Debug, Display)]
pub enum WriteError {
  #[display(fmt = "This link has already been submitted.")]
  DuplicateSubmission,
  #[display(fmt = "A post can have at most {} images, this one already has {}.", _0, _1)]
  TooManyImages(usize, usize),
  #[display(fmt = "This email address is already registered.")]
  DuplicateEmail,
  #[display(fmt = "This nickname is already taken.")]
  DuplicateNickname,
  #[display(fmt = "Database error: {}", _0)]
  Database(Report)
}

impl std::error::Error for WriteError {}

impl From<Report> for WriteError {
  fn from(e: Report) -> Self {
    WriteError::Database(e)
  }
}

impl From<rusqlite::Error> for WriteError {
  fn from(e: rusqlite::Error) -> Self {
    WriteError::Database(Report::new(e))
  }
}

impl From<r2d2::Error> for WriteError {
  fn from(e: r2d2::Error) -> Self {
    WriteError::Database(Report::new(e))
  }
}

// UNIQUE constraint failures, with the "table.column" that
// failed when we need to know. SQLite puts it in the
// error message: "UNIQUE constraint failed: users.email".
pub(crate) fn unique_violation(e: &rusqlite::Error) -> Option<&str> {
  match e {
    rusqlite::Error::SqliteFailure(err, msg)
      if err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
        || err.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
      Some(msg.as_deref().unwrap_or_default()),
    _ => None
  }
}
