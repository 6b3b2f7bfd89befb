use rusqlite::{Row, Error};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use crate::board::{LinkCategory, PostCategory};
use super::entities::*;

// Column lists go with their mapper so the indexes
// can't drift apart. Tables are always aliased the same
// way in the queries (p, l, c, i, u, pr, m).

pub const POST_COLUMNS: &'static str = "p.id, p.title, p.content, p.category, \
  p.created_at, p.views, p.author, p.user_id, p.is_recommended";

pub fn map_post(row: &Row) -> Result<Post, Error> {
  Ok(Post {
    id: row.get(0)?,
    title: row.get(1)?,
    content: row.get(2)?,
    category: row.get(3)?,
    created_at: row.get(4)?,
    views: row.get(5)?,
    author: row.get(6)?,
    user_id: row.get(7)?,
    is_recommended: row.get(8)?
  })
}

// POST_COLUMNS followed by like count, liked by viewer 
// and comment count:
pub fn map_post_row(row: &Row) -> Result<PostRow, Error> {
  Ok(PostRow {
    post: map_post(row)?,
    like_count: row.get(9)?,
    liked_by_viewer: row.get(10)?,
    comment_count: row.get(11)?
  })
}

pub const LINK_COLUMNS: &'static str = "l.id, l.title, l.url, l.category, \
  l.author, l.user_id, l.created_at, l.fingerprint, l.is_recommended";

pub fn map_link(row: &Row) -> Result<LinkPost, Error> {
  Ok(LinkPost {
    id: row.get(0)?,
    title: row.get(1)?,
    url: row.get(2)?,
    category: row.get(3)?,
    author: row.get(4)?,
    user_id: row.get(5)?,
    created_at: row.get(6)?,
    fingerprint: row.get(7)?,
    is_recommended: row.get(8)?
  })
}

// LINK_COLUMNS followed by like count and liked by viewer:
pub fn map_link_row(row: &Row) -> Result<LinkRow, Error> {
  Ok(LinkRow {
    link: map_link(row)?,
    like_count: row.get(9)?,
    liked_by_viewer: row.get(10)?
  })
}

pub const COMMENT_COLUMNS: &'static str = "c.id, c.post_id, c.author, \
  c.user_id, c.content, c.created_at";

pub fn map_comment(row: &Row) -> Result<Comment, Error> {
  Ok(Comment {
    id: row.get(0)?,
    post_id: row.get(1)?,
    author: row.get(2)?,
    user_id: row.get(3)?,
    content: row.get(4)?,
    created_at: row.get(5)?
  })
}

pub const IMAGE_COLUMNS: &'static str = "i.id, i.post_id, i.file_key, \
  i.content_type, i.created_at";

pub fn map_image(row: &Row) -> Result<PostImage, Error> {
  Ok(PostImage {
    id: row.get(0)?,
    post_id: row.get(1)?,
    file_key: row.get(2)?,
    content_type: row.get(3)?,
    created_at: row.get(4)?
  })
}

pub const ACCOUNT_COLUMNS: &'static str = "u.id, u.email, u.password_hash, u.created_at";

pub fn map_account(row: &Row) -> Result<Account, Error> {
  Ok(Account {
    id: row.get(0)?,
    email: row.get(1)?,
    password_hash: row.get(2)?,
    created_at: row.get(3)?
  })
}

// Needs a LEFT JOIN on profiles, hence the IFNULLs.
pub const MEMBER_COLUMNS: &'static str = "u.id, u.email, pr.nickname, \
  IFNULL(pr.points, 0), IFNULL(pr.is_temporary_password, 0)";

pub fn map_member(row: &Row) -> Result<Member, Error> {
  Ok(Member {
    id: row.get(0)?,
    email: row.get(1)?,
    nickname: row.get(2)?,
    points: row.get(3)?,
    is_temporary_password: row.get(4)?
  })
}

pub const MATCH_COLUMNS: &'static str = "m.id, m.competition, m.home_team, \
  m.away_team, m.kickoff, m.venue, m.home_score, m.away_score, m.status";

pub fn map_soccer_match(row: &Row) -> Result<SoccerMatch, Error> {
  Ok(SoccerMatch {
    id: row.get(0)?,
    competition: row.get(1)?,
    home_team: row.get(2)?,
    away_team: row.get(3)?,
    kickoff: row.get(4)?,
    venue: row.get(5)?,
    home_score: row.get(6)?,
    away_score: row.get(7)?,
    status: row.get(8)?
  })
}

// Categories are stored as their slug.

impl FromSql for PostCategory {
  fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
    value.as_str()?
      .parse()
      .map_err(|e| FromSqlError::Other(Box::new(e)))
  }
}

impl ToSql for PostCategory {
  fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
    Ok(ToSqlOutput::from(self.slug()))
  }
}

impl FromSql for LinkCategory {
  fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
    value.as_str()?
      .parse()
      .map_err(|e| FromSqlError::Other(Box::new(e)))
  }
}

impl ToSql for LinkCategory {
  fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
    Ok(ToSqlOutput::from(self.slug()))
  }
}
