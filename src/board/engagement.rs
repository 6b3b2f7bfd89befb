use serde::Serialize;

// There are two ways of "liking" something on the board and
// they are not interchangeable:
// - Toggle: a single global flag anyone can flip, no idea
//   who did it. Click twice and it's back to normal.
// - LikeSet: set of users who liked the record, needs to be
//   signed in. The count is the size of the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engagement {
  Toggle,
  LikeSet
}

impl Engagement {
  pub fn as_str(self) -> &'static str {
    match self {
      Engagement::Toggle => "toggle",
      Engagement::LikeSet => "like"
    }
  }
}

// Records that can be recommended or liked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
  Post(i64),
  Link(i64)
}

impl Target {
  pub fn id(self) -> i64 {
    match self {
      Target::Post(id) | Target::Link(id) => id
    }
  }
}

// Response body of the like endpoints, the field names
// are what the frontend scripts expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeState {
  pub like_count: i64,
  pub is_liked: bool
}

// Viewer specific engagement info for one record in
// a listing or on a detail page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngagementView {
  pub model: &'static str,
  pub active: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub like_count: Option<i64>
}

impl EngagementView {
  pub fn new(
    engagement: Engagement,
    is_recommended: bool,
    like_count: i64,
    liked_by_viewer: bool
  ) -> Self {
    match engagement {
      Engagement::Toggle => Self {
        model: engagement.as_str(),
        active: is_recommended,
        like_count: None
      },
      Engagement::LikeSet => Self {
        model: engagement.as_str(),
        active: liked_by_viewer,
        like_count: Some(like_count)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn toggle_view_ignores_likes() {
    let sut = EngagementView::new(Engagement::Toggle, true, 12, false);
    assert!(sut.active);
    assert_eq!(sut.like_count, None);
    assert_eq!(sut.model, "toggle");
  }

  #[test]
  fn like_set_view_ignores_recommend_flag() {
    let sut = EngagementView::new(Engagement::LikeSet, true, 2, false);
    assert!(!sut.active);
    assert_eq!(sut.like_count, Some(2));
  }

  #[test]
  fn like_state_serializes_with_expected_keys() {
    let sut = LikeState { like_count: 3, is_liked: true };
    assert_eq!(
      serde_json::to_string(&sut).unwrap(), 
      r#"{"like_count":3,"is_liked":true}"#
    );
  }
}
