use serde::{Deserialize, Serialize};
use crate::board::{LinkCategory, PostCategory};
use crate::utils::time_utils::current_timestamp;

// Same convention as always, records that haven't been
// saved yet have an id of -1.
// Timestamps are Unix timestamps in seconds.

#[derive(Debug, Clone)]
pub struct Account {
  pub id: i64,
  pub email: String,
  pub password_hash: String,
  pub created_at: i64
}

// Account joined with its profile. Old accounts may not
// have a profile, hence all the Options.
#[derive(Debug, Clone)]
pub struct Member {
  pub id: i64,
  pub email: String,
  pub nickname: Option<String>,
  pub points: i64,
  pub is_temporary_password: bool
}

impl Member {
  // Nickname when there's a profile, email otherwise.
  pub fn display_name(&self) -> &str {
    self.nickname.as_deref().unwrap_or(&self.email)
  }
}

#[derive(Debug, Clone)]
pub struct Post {
  pub id: i64,
  pub title: String,
  pub content: String,
  pub category: PostCategory,
  pub created_at: i64,
  pub views: i64,
  pub author: String,
  pub user_id: Option<i64>,
  pub is_recommended: bool
}

impl Post {
  pub fn new(
    title: String, 
    content: String, 
    category: PostCategory, 
    author: String, 
    user_id: Option<i64>
  ) -> Self {
    Self {
      id: -1,
      title,
      content,
      category,
      created_at: current_timestamp(),
      views: 0,
      author,
      user_id,
      is_recommended: false
    }
  }

  pub fn is_owned_by(&self, member: &Member) -> bool {
    self.user_id == Some(member.id)
  }
}

// Post with the engagement info for one viewer, what 
// the listings get.
#[derive(Debug, Clone)]
pub struct PostRow {
  pub post: Post,
  pub like_count: i64,
  pub liked_by_viewer: bool,
  pub comment_count: i64
}

#[derive(Debug, Clone)]
pub struct PostImage {
  pub id: i64,
  pub post_id: i64,
  // Name of the file in the media store
  pub file_key: String,
  pub content_type: String,
  pub created_at: i64
}

// Image that was uploaded and stored but isn't attached
// to any post yet.
#[derive(Debug, Clone)]
pub struct NewImage {
  pub file_key: String,
  pub content_type: String
}

#[derive(Debug, Clone)]
pub struct Comment {
  pub id: i64,
  pub post_id: i64,
  pub author: String,
  pub user_id: Option<i64>,
  pub content: String,
  pub created_at: i64
}

#[derive(Debug, Clone)]
pub struct LinkPost {
  pub id: i64,
  pub title: String,
  // Empty string when there's no URL
  pub url: String,
  pub category: LinkCategory,
  pub author: String,
  pub user_id: Option<i64>,
  pub created_at: i64,
  pub fingerprint: Option<String>,
  pub is_recommended: bool
}

impl LinkPost {
  pub fn new(
    title: String, 
    url: String, 
    category: LinkCategory, 
    author: String,
    user_id: Option<i64>
  ) -> Self {
    Self {
      id: -1,
      title,
      url,
      category,
      author,
      user_id,
      created_at: current_timestamp(),
      fingerprint: None,
      is_recommended: false
    }
  }

  // Links submitted anonymously can't be edited by anyone.
  pub fn is_owned_by(&self, member: &Member) -> bool {
    self.user_id == Some(member.id)
  }
}

#[derive(Debug, Clone)]
pub struct LinkRow {
  pub link: LinkPost,
  pub like_count: i64,
  pub liked_by_viewer: bool
}

// Reference data, imported in bulk as JSON so this one
// is directly deserializable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoccerMatch {
  #[serde(default = "unsaved_id", skip_serializing)]
  pub id: i64,
  pub competition: String,
  pub home_team: String,
  pub away_team: String,
  pub kickoff: i64,
  #[serde(default)]
  pub venue: Option<String>,
  #[serde(default)]
  pub home_score: Option<i32>,
  #[serde(default)]
  pub away_score: Option<i32>,
  #[serde(default = "scheduled")]
  pub status: String
}

fn unsaved_id() -> i64 {
  -1
}

fn scheduled() -> String {
  String::from("scheduled")
}
