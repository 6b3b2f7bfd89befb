use rusqlite::{params, params_from_iter, Connection, ToSql};
use eyre::WrapErr;
use color_eyre::{Report, Result};
use crate::board::{LinkFeed, LinkFilter};
use crate::board::fingerprint::ensure_fingerprint;
use super::{Pool, WriteError, count, select_many, select_one, unique_violation};
use super::entities::{LinkPost, LinkRow};
use super::mappers::{LINK_COLUMNS, map_link, map_link_row};
use super::helpers::{generate_in_placeholders, like_pattern, search_clause};
use super::queries::{Order, OrderBy, Query};

const LIKE_COUNT_FIELD: &'static str =
  "(SELECT count(*) FROM link_likes ll WHERE ll.link_id = l.id)";
const LIKED_BY_VIEWER_FIELD: &'static str =
  "EXISTS (SELECT 1 FROM link_likes lv WHERE lv.link_id = l.id AND lv.user_id = ?)";

pub fn fingerprint_exists(
  pool: &Pool,
  fingerprint: &str,
  exclude_id: i64
) -> Result<bool> {
  let n = count(
    pool,
    "SELECT count(*) FROM link_posts WHERE fingerprint = ? AND id != ?",
    params![fingerprint, exclude_id]
  )?;
  Ok(n > 0)
}

// Inserts when the id is -1, updates otherwise. The fingerprint
// is only ever written by the insert.
// The check on the fingerprint is just to fail early, two
// people posting the same link at the same time would both
// pass it. The unique index catches that and we give the
// same error.
pub fn save_link_post(pool: &Pool, link: &mut LinkPost) -> Result<(), WriteError> {
  let fp = ensure_fingerprint(link).to_string();
  if fingerprint_exists(pool, &fp, link.id)? {
    return Err(WriteError::DuplicateSubmission);
  }
  let conn = pool.get()?;
  write_link_post(&conn, link, &fp)
}

// The write itself, with the unique index as the last
// word on duplicates.
fn write_link_post(
  conn: &Connection,
  link: &mut LinkPost,
  fp: &str
) -> Result<(), WriteError> {
  let res = if link.id < 0 {
    conn.execute(
      "INSERT INTO link_posts
      (title, url, category, author, user_id, created_at, fingerprint, is_recommended)
      VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
      params![
        link.title,
        link.url,
        link.category,
        link.author,
        link.user_id,
        link.created_at,
        fp,
        link.is_recommended
      ]
    )
  } else {
    conn.execute(
      "UPDATE link_posts SET title = ?, url = ?, category = ?, author = ?
      WHERE id = ?",
      params![link.title, link.url, link.category, link.author, link.id]
    )
  };
  match res {
    Ok(_) => {
      if link.id < 0 {
        link.id = conn.last_insert_rowid();
      }
      Ok(())
    },
    Err(e) if unique_violation(&e).is_some() => Err(WriteError::DuplicateSubmission),
    Err(e) => Err(WriteError::Database(
      Report::new(e).wrap_err("Saving link post")
    ))
  }
}

pub fn link_by_id(pool: &Pool, id: i64) -> Result<Option<LinkPost>> {
  select_one(
    pool,
    &Query::select(&[LINK_COLUMNS], "link_posts l")
      .where_and(String::from("l.id = ?"))
      .to_string(),
    params![id],
    map_link
  ).context("Fetching link post by id")
}

// Likes go away with the cascade.
pub fn delete_link_post(pool: &Pool, id: i64) -> Result<bool> {
  let conn = pool.get()?;
  let deleted = conn.execute("DELETE FROM link_posts WHERE id = ?", params![id])
    .context("Deleting link post")?;
  Ok(deleted > 0)
}

// The WHERE part is the same for the count and the
// listing, so it's built once here with its parameters.
fn feed_query(
  fields: &[&str],
  feed: &LinkFeed,
  search: Option<&str>
) -> (Query, Vec<Box<dyn ToSql>>) {
  let mut query = Query::select(fields, "link_posts l");
  let mut values: Vec<Box<dyn ToSql>> = Vec::new();
  match feed.filter {
    LinkFilter::Category(category) => {
      query = query.where_and(String::from("l.category = ?"));
      values.push(Box::new(category));
    },
    LinkFilter::Recommended(categories) => {
      query = query
        .where_and(String::from("l.is_recommended = 1"))
        .where_and(format!(
          "l.category IN ({})",
          generate_in_placeholders(categories.len())
        ));
      for c in categories {
        values.push(Box::new(*c));
      }
    },
    LinkFilter::Everything => ()
  }
  if let Some(terms) = search.map(str::trim).filter(|t| !t.is_empty()) {
    query = query.where_and(search_clause("l", feed.search_columns));
    let pattern = like_pattern(terms);
    for _ in feed.search_columns {
      values.push(Box::new(pattern.clone()));
    }
  }
  (query, values)
}

pub fn link_count(pool: &Pool, feed: &LinkFeed, search: Option<&str>) -> Result<usize> {
  let (query, values) = feed_query(&[LINK_COLUMNS], feed, search);
  count(pool, &query.count().to_string(), params_from_iter(values))
    .context(format!("Counting links of feed {}", feed.slug))
}

// Newest first. The viewer is only used for the "liked"
// flag, -1 never matches anybody.
pub fn links_from_to(
  pool: &Pool,
  feed: &LinkFeed,
  search: Option<&str>,
  viewer: Option<i64>,
  offset: usize,
  limit: usize
) -> Result<Vec<LinkRow>> {
  let (query, values) = feed_query(
    &[LINK_COLUMNS, LIKE_COUNT_FIELD, LIKED_BY_VIEWER_FIELD],
    feed,
    search
  );
  let query = query
    .order(OrderBy::new(Order::Desc, "l.created_at"))
    .order(OrderBy::new(Order::Desc, "l.id"))
    .limit(limit)
    .offset(offset);
  // The viewer placeholder is in the SELECT part so it
  // comes before the WHERE ones.
  let mut all_values: Vec<Box<dyn ToSql>> = vec![Box::new(viewer.unwrap_or(-1))];
  all_values.extend(values);
  select_many(
    pool,
    &query.to_string(),
    params_from_iter(all_values),
    map_link_row
  ).context(format!("Listing links of feed {}", feed.slug))
}

pub fn link_count_by_user(pool: &Pool, user_id: i64) -> Result<usize> {
  count(pool, "SELECT count(*) FROM link_posts WHERE user_id = ?", params![user_id])
}
