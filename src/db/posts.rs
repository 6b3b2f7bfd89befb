use rusqlite::{params, params_from_iter, Connection, ToSql};
use eyre::WrapErr;
use color_eyre::Result;
use crate::board::{PostCategory, PostFeed, PostFilter, MAX_POST_IMAGES, POST_POINTS, COMMENT_POINTS};
use crate::utils::time_utils::current_timestamp;
use super::{Pool, WriteError, count, select_many, select_one};
use super::accounts::award_points;
use super::entities::{Comment, NewImage, Post, PostImage, PostRow};
use super::mappers::*;
use super::helpers::{like_pattern, search_clause};
use super::queries::{Order, OrderBy, Query};

const LIKE_COUNT_FIELD: &'static str =
  "(SELECT count(*) FROM post_likes pl WHERE pl.post_id = p.id)";
const LIKED_BY_VIEWER_FIELD: &'static str =
  "EXISTS (SELECT 1 FROM post_likes pv WHERE pv.post_id = p.id AND pv.user_id = ?)";
const COMMENT_COUNT_FIELD: &'static str =
  "(SELECT count(*) FROM comments pc WHERE pc.post_id = p.id)";

fn insert_images(conn: &Connection, post_id: i64, images: &[NewImage]) -> Result<()> {
  let now = current_timestamp();
  let mut stmt = conn.prepare(
    "INSERT INTO post_images (post_id, file_key, content_type, created_at)
    VALUES (?, ?, ?, ?)"
  )?;
  for image in images {
    stmt.execute(params![post_id, image.file_key, image.content_type, now])
      .context("Inserting post image")?;
  }
  Ok(())
}

fn image_count(conn: &Connection, post_id: i64) -> Result<usize> {
  let n: i64 = conn.query_row(
    "SELECT count(*) FROM post_images WHERE post_id = ?",
    params![post_id],
    |row| row.get(0)
  )?;
  Ok(n as usize)
}

// Inserts the post with its images and gives the author
// their points, all or nothing.
pub fn insert_post(
  pool: &Pool,
  post: &mut Post,
  images: &[NewImage]
) -> Result<(), WriteError> {
  if images.len() > MAX_POST_IMAGES {
    return Err(WriteError::TooManyImages(MAX_POST_IMAGES, 0));
  }
  let mut conn = pool.get()?;
  let tx = conn.transaction()?;
  tx.execute(
    "INSERT INTO posts
    (title, content, category, created_at, views, author, user_id, is_recommended)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    params![
      post.title,
      post.content,
      post.category,
      post.created_at,
      post.views,
      post.author,
      post.user_id,
      post.is_recommended
    ]
  ).context("Inserting post")?;
  let id = tx.last_insert_rowid();
  insert_images(&tx, id, images)?;
  if let Some(user_id) = post.user_id {
    award_points(&tx, user_id, POST_POINTS)?;
  }
  tx.commit().context("Committing new post")?;
  post.id = id;
  Ok(())
}

// Title, content and category can change. New images
// only go in if there's enough room left for all of them.
pub fn update_post(
  pool: &Pool,
  post: &Post,
  new_images: &[NewImage]
) -> Result<(), WriteError> {
  let mut conn = pool.get()?;
  let tx = conn.transaction()?;
  let existing = image_count(&tx, post.id)?;
  if existing + new_images.len() > MAX_POST_IMAGES {
    return Err(WriteError::TooManyImages(MAX_POST_IMAGES, existing));
  }
  tx.execute(
    "UPDATE posts SET title = ?, content = ?, category = ? WHERE id = ?",
    params![post.title, post.content, post.category, post.id]
  ).context("Updating post")?;
  insert_images(&tx, post.id, new_images)?;
  tx.commit().context("Committing post update")?;
  Ok(())
}

pub fn post_by_id(pool: &Pool, id: i64) -> Result<Option<Post>> {
  select_one(
    pool,
    &Query::select(&[POST_COLUMNS], "posts p")
      .where_and(String::from("p.id = ?"))
      .to_string(),
    params![id],
    map_post
  ).context("Fetching post by id")
}

pub fn post_row_by_id(pool: &Pool, id: i64, viewer: Option<i64>) -> Result<Option<PostRow>> {
  select_one(
    pool,
    &Query::select(
      &[POST_COLUMNS, LIKE_COUNT_FIELD, LIKED_BY_VIEWER_FIELD, COMMENT_COUNT_FIELD],
      "posts p"
    ).where_and(String::from("p.id = ?")).to_string(),
    params![viewer.unwrap_or(-1), id],
    map_post_row
  ).context("Fetching post row by id")
}

// Every GET of the detail page counts as a view, no
// deduplication of any sort.
pub fn increment_views(pool: &Pool, id: i64) -> Result<bool> {
  let conn = pool.get()?;
  let updated = conn.execute("UPDATE posts SET views = views + 1 WHERE id = ?", params![id])
    .context("Incrementing post views")?;
  Ok(updated > 0)
}

pub fn post_images(pool: &Pool, post_id: i64) -> Result<Vec<PostImage>> {
  select_many(
    pool,
    &Query::select(&[IMAGE_COLUMNS], "post_images i")
      .where_and(String::from("i.post_id = ?"))
      .order(OrderBy::new(Order::Asc, "i.id"))
      .to_string(),
    params![post_id],
    map_image
  )
}

// Gives back the removed image so the caller can get rid
// of the file if nothing else uses it.
pub fn delete_post_image(pool: &Pool, post_id: i64, image_id: i64) -> Result<Option<PostImage>> {
  let image = select_one(
    pool,
    &Query::select(&[IMAGE_COLUMNS], "post_images i")
      .where_and(String::from("i.id = ?"))
      .where_and(String::from("i.post_id = ?"))
      .to_string(),
    params![image_id, post_id],
    map_image
  )?;
  if let Some(ref img) = image {
    let conn = pool.get()?;
    conn.execute("DELETE FROM post_images WHERE id = ?", params![img.id])
      .context("Deleting post image")?;
  }
  Ok(image)
}

// Files are content addressed so two posts with the same
// picture share the file.
pub fn file_key_in_use(pool: &Pool, file_key: &str) -> Result<bool> {
  let n = count(
    pool,
    "SELECT count(*) FROM post_images WHERE file_key = ?",
    params![file_key]
  )?;
  Ok(n > 0)
}

// Removes the post with everything hanging off it in one
// transaction. The cascades would do it too but I'd rather
// not depend on the pragma being on.
// Returns the file keys of the images that were attached.
pub fn delete_post(pool: &Pool, id: i64) -> Result<Option<Vec<String>>> {
  let mut conn = pool.get()?;
  let tx = conn.transaction()?;
  let file_keys: Vec<String> = {
    let mut stmt = tx.prepare("SELECT file_key FROM post_images WHERE post_id = ?")?;
    let keys = stmt.query_map(params![id], |row| row.get(0))?
      .collect::<Result<Vec<String>, rusqlite::Error>>()?;
    keys
  };
  tx.execute("DELETE FROM post_likes WHERE post_id = ?", params![id])?;
  tx.execute("DELETE FROM comments WHERE post_id = ?", params![id])?;
  tx.execute("DELETE FROM post_images WHERE post_id = ?", params![id])?;
  let deleted = tx.execute("DELETE FROM posts WHERE id = ?", params![id])?;
  if deleted == 0 {
    return Ok(None);
  }
  tx.commit().context("Deleting post")?;
  Ok(Some(file_keys))
}

pub fn add_comment(pool: &Pool, comment: &mut Comment) -> Result<()> {
  let mut conn = pool.get()?;
  let tx = conn.transaction()?;
  tx.execute(
    "INSERT INTO comments (post_id, author, user_id, content, created_at)
    VALUES (?, ?, ?, ?, ?)",
    params![
      comment.post_id,
      comment.author,
      comment.user_id,
      comment.content,
      comment.created_at
    ]
  ).context("Inserting comment")?;
  let id = tx.last_insert_rowid();
  if let Some(user_id) = comment.user_id {
    award_points(&tx, user_id, COMMENT_POINTS)?;
  }
  tx.commit().context("Committing comment")?;
  comment.id = id;
  Ok(())
}

// Oldest first, like a conversation.
pub fn comments_for_post(pool: &Pool, post_id: i64) -> Result<Vec<Comment>> {
  select_many(
    pool,
    &Query::select(&[COMMENT_COLUMNS], "comments c")
      .where_and(String::from("c.post_id = ?"))
      .order(OrderBy::new(Order::Asc, "c.created_at"))
      .order(OrderBy::new(Order::Asc, "c.id"))
      .to_string(),
    params![post_id],
    map_comment
  )
}

fn feed_query(
  fields: &[&str],
  feed: &PostFeed,
  search: Option<&str>
) -> (Query, Vec<Box<dyn ToSql>>) {
  let mut query = Query::select(fields, "posts p");
  let mut values: Vec<Box<dyn ToSql>> = Vec::new();
  match feed.filter {
    PostFilter::Category(category) => {
      query = query.where_and(String::from("p.category = ?"));
      values.push(Box::new(category));
    },
    PostFilter::Recommended => {
      query = query
        .where_and(String::from("p.is_recommended = 1"))
        .where_and(String::from("p.category != ?"));
      values.push(Box::new(PostCategory::Secret));
    }
  }
  if let Some(terms) = search.map(str::trim).filter(|t| !t.is_empty()) {
    query = query.where_and(search_clause("p", feed.search_columns));
    let pattern = like_pattern(terms);
    for _ in feed.search_columns {
      values.push(Box::new(pattern.clone()));
    }
  }
  (query, values)
}

pub fn post_count(pool: &Pool, feed: &PostFeed, search: Option<&str>) -> Result<usize> {
  let (query, values) = feed_query(&[POST_COLUMNS], feed, search);
  count(pool, &query.count().to_string(), params_from_iter(values))
    .context(format!("Counting posts of feed {}", feed.slug))
}

pub fn posts_from_to(
  pool: &Pool,
  feed: &PostFeed,
  search: Option<&str>,
  viewer: Option<i64>,
  offset: usize,
  limit: usize
) -> Result<Vec<PostRow>> {
  let (query, values) = feed_query(
    &[POST_COLUMNS, LIKE_COUNT_FIELD, LIKED_BY_VIEWER_FIELD, COMMENT_COUNT_FIELD],
    feed,
    search
  );
  let query = query
    .order(OrderBy::new(Order::Desc, "p.created_at"))
    .order(OrderBy::new(Order::Desc, "p.id"))
    .limit(limit)
    .offset(offset);
  let mut all_values: Vec<Box<dyn ToSql>> = vec![Box::new(viewer.unwrap_or(-1))];
  all_values.extend(values);
  select_many(
    pool,
    &query.to_string(),
    params_from_iter(all_values),
    map_post_row
  ).context(format!("Listing posts of feed {}", feed.slug))
}

pub fn post_count_by_user(pool: &Pool, user_id: i64) -> Result<usize> {
  count(pool, "SELECT count(*) FROM posts WHERE user_id = ?", params![user_id])
}

pub fn comment_count_by_user(pool: &Pool, user_id: i64) -> Result<usize> {
  count(pool, "SELECT count(*) FROM comments WHERE user_id = ?", params![user_id])
}
