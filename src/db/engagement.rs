use rusqlite::{params, OptionalExtension};
use eyre::WrapErr;
use color_eyre::Result;
use crate::board::{LikeState, Target};
use super::Pool;

// Record table, like table and the like table column
// pointing to the record.
fn tables(target: Target) -> (&'static str, &'static str, &'static str) {
  match target {
    Target::Post(_) => ("posts", "post_likes", "post_id"),
    Target::Link(_) => ("link_posts", "link_likes", "link_id")
  }
}

// Flips the recommended flag and gives the new value, None
// when the record doesn't exist.
pub fn toggle_recommended(pool: &Pool, target: Target) -> Result<Option<bool>> {
  let (table, _, _) = tables(target);
  let conn = pool.get()?;
  let flag = conn.query_row(
    &format!(
      "UPDATE {} SET is_recommended = NOT is_recommended
      WHERE id = ? RETURNING is_recommended",
      table
    ),
    params![target.id()],
    |row| row.get::<_, bool>(0)
  ).optional()
    .context("Toggling recommended flag")?;
  Ok(flag)
}

// Adds the user to the liked-by set if they're not in it,
// removes them otherwise. None when the record doesn't
// exist.
pub fn toggle_like(pool: &Pool, target: Target, user_id: i64) -> Result<Option<LikeState>> {
  let (table, like_table, column) = tables(target);
  let mut conn = pool.get()?;
  let tx = conn.transaction()?;
  let exists: bool = tx.query_row(
    &format!("SELECT EXISTS (SELECT 1 FROM {} WHERE id = ?)", table),
    params![target.id()],
    |row| row.get(0)
  )?;
  if !exists {
    return Ok(None);
  }
  let removed = tx.execute(
    &format!("DELETE FROM {} WHERE {} = ? AND user_id = ?", like_table, column),
    params![target.id(), user_id]
  )?;
  if removed == 0 {
    tx.execute(
      &format!("INSERT INTO {} ({}, user_id) VALUES (?, ?)", like_table, column),
      params![target.id(), user_id]
    )?;
  }
  let like_count: i64 = tx.query_row(
    &format!("SELECT count(*) FROM {} WHERE {} = ?", like_table, column),
    params![target.id()],
    |row| row.get(0)
  )?;
  tx.commit().context("Toggling like")?;
  Ok(Some(LikeState {
    like_count,
    is_liked: removed == 0
  }))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::test_pool;

  fn setup(pool: &Pool) -> (i64, i64, i64) {
    let conn = pool.get().unwrap();
    conn.execute_batch(
      "INSERT INTO users (email, password_hash, created_at) VALUES ('a@b.c', 'x', 0);
      INSERT INTO users (email, password_hash, created_at) VALUES ('d@e.f', 'x', 0);
      INSERT INTO posts (title, content, created_at, author) VALUES ('t', 'c', 0, 'a');"
    ).unwrap();
    (1, 2, conn.last_insert_rowid())
  }

  #[test]
  fn recommend_twice_restores_state() {
    let pool = test_pool();
    let (_, _, post) = setup(&pool);
    assert_eq!(toggle_recommended(&pool, Target::Post(post)).unwrap(), Some(true));
    assert_eq!(toggle_recommended(&pool, Target::Post(post)).unwrap(), Some(false));
  }

  #[test]
  fn recommend_missing_record() {
    let pool = test_pool();
    assert_eq!(toggle_recommended(&pool, Target::Post(99)).unwrap(), None);
    assert_eq!(toggle_recommended(&pool, Target::Link(99)).unwrap(), None);
  }

  #[test]
  fn like_twice_restores_state() {
    let pool = test_pool();
    let (user, _, post) = setup(&pool);
    let sut = toggle_like(&pool, Target::Post(post), user).unwrap().unwrap();
    assert_eq!(sut, LikeState { like_count: 1, is_liked: true });
    let sut = toggle_like(&pool, Target::Post(post), user).unwrap().unwrap();
    assert_eq!(sut, LikeState { like_count: 0, is_liked: false });
  }

  #[test]
  fn like_count_is_the_set_size() {
    let pool = test_pool();
    let (a, b, post) = setup(&pool);
    toggle_like(&pool, Target::Post(post), a).unwrap();
    let sut = toggle_like(&pool, Target::Post(post), b).unwrap().unwrap();
    assert_eq!(sut, LikeState { like_count: 2, is_liked: true });
    let sut = toggle_like(&pool, Target::Post(post), a).unwrap().unwrap();
    assert_eq!(sut, LikeState { like_count: 1, is_liked: false });
    let n: i64 = pool.get().unwrap()
      .query_row("SELECT count(*) FROM post_likes WHERE post_id = ?", params![post], |r| r.get(0))
      .unwrap();
    assert_eq!(n, 1);
  }

  #[test]
  fn like_missing_record() {
    let pool = test_pool();
    let (user, _, _) = setup(&pool);
    assert!(toggle_like(&pool, Target::Link(42), user).unwrap().is_none());
  }
}
