use rusqlite::{params, Connection};
use eyre::WrapErr;
use color_eyre::{Report, Result};
use crate::board::SIGNUP_POINTS;
use crate::utils::time_utils::current_timestamp;
use super::{Pool, WriteError, count, select_one, unique_violation};
use super::entities::{Account, Member};
use super::mappers::{ACCOUNT_COLUMNS, MEMBER_COLUMNS, map_account, map_member};
use super::queries::Query;

const MEMBER_FROM: &'static str = "users u LEFT JOIN profiles pr ON pr.user_id = u.id";

// Points only ever go up. Takes a connection so it can run
// inside the transaction of whatever earned the points.
pub(crate) fn award_points(conn: &Connection, user_id: i64, points: i64) -> Result<()> {
  conn.execute(
    "UPDATE profiles SET points = points + ? WHERE user_id = ?",
    params![points, user_id]
  ).context("Awarding points")?;
  Ok(())
}

fn map_unique_violation(e: rusqlite::Error) -> WriteError {
  match unique_violation(&e) {
    Some(msg) if msg.contains("users.email") => WriteError::DuplicateEmail,
    Some(msg) if msg.contains("profiles.nickname") => WriteError::DuplicateNickname,
    _ => WriteError::Database(Report::new(e).wrap_err("Creating account"))
  }
}

// User and profile go in together, with the signup points.
pub fn create_account(
  pool: &Pool,
  email: &str,
  password_hash: &str,
  nickname: &str
) -> Result<Member, WriteError> {
  let mut conn = pool.get()?;
  let tx = conn.transaction()?;
  tx.execute(
    "INSERT INTO users (email, password_hash, created_at) VALUES (?, ?, ?)",
    params![email, password_hash, current_timestamp()]
  ).map_err(map_unique_violation)?;
  let id = tx.last_insert_rowid();
  tx.execute(
    "INSERT INTO profiles (user_id, nickname, points, is_temporary_password)
    VALUES (?, ?, ?, 0)",
    params![id, nickname, SIGNUP_POINTS]
  ).map_err(map_unique_violation)?;
  tx.commit()?;
  Ok(Member {
    id,
    email: email.to_string(),
    nickname: Some(nickname.to_string()),
    points: SIGNUP_POINTS,
    is_temporary_password: false
  })
}

pub fn account_by_email(pool: &Pool, email: &str) -> Result<Option<Account>> {
  select_one(
    pool,
    &Query::select(&[ACCOUNT_COLUMNS], "users u")
      .where_and(String::from("u.email = ?"))
      .to_string(),
    params![email],
    map_account
  ).context("Fetching account by email")
}

pub fn account_by_id(pool: &Pool, id: i64) -> Result<Option<Account>> {
  select_one(
    pool,
    &Query::select(&[ACCOUNT_COLUMNS], "users u")
      .where_and(String::from("u.id = ?"))
      .to_string(),
    params![id],
    map_account
  ).context("Fetching account by id")
}

pub fn member_by_id(pool: &Pool, id: i64) -> Result<Option<Member>> {
  select_one(
    pool,
    &Query::select(&[MEMBER_COLUMNS], MEMBER_FROM)
      .where_and(String::from("u.id = ?"))
      .to_string(),
    params![id],
    map_member
  ).context("Fetching member by id")
}

// Password reset asks for both, as a (weak) proof that
// it's really you.
pub fn member_by_email_and_nickname(
  pool: &Pool,
  email: &str,
  nickname: &str
) -> Result<Option<Member>> {
  select_one(
    pool,
    &Query::select(&[MEMBER_COLUMNS], MEMBER_FROM)
      .where_and(String::from("u.email = ?"))
      .where_and(String::from("pr.nickname = ?"))
      .to_string(),
    params![email, nickname],
    map_member
  ).context("Fetching member by email and nickname")
}

pub fn set_password(
  pool: &Pool,
  user_id: i64,
  password_hash: &str,
  temporary: bool
) -> Result<()> {
  let mut conn = pool.get()?;
  let tx = conn.transaction()?;
  tx.execute(
    "UPDATE users SET password_hash = ? WHERE id = ?",
    params![password_hash, user_id]
  )?;
  tx.execute(
    "UPDATE profiles SET is_temporary_password = ? WHERE user_id = ?",
    params![temporary, user_id]
  )?;
  tx.commit().context("Setting password")
}

pub fn email_exists(pool: &Pool, email: &str) -> Result<bool> {
  Ok(count(pool, "SELECT count(*) FROM users WHERE email = ?", params![email])? > 0)
}

pub fn nickname_exists(pool: &Pool, nickname: &str) -> Result<bool> {
  Ok(count(pool, "SELECT count(*) FROM profiles WHERE nickname = ?", params![nickname])? > 0)
}
