use serde::Serialize;
use crate::board::{
  engagement::EngagementView,
  feeds::POST_FEEDS,
  Engagement,
  LinkCategory,
  LinkFeed,
  PageInfo,
  PostCategory,
  PostFeed
};
use crate::config::SiteInfo;
use crate::db::entities::*;
use crate::utils::time_utils::{timestamp_to_date_string, DateFormat};
use super::forms::FormErrors;
use super::media::MediaStore;

// I'm going to use the From trait to convert
// entites to DTOs where there's nothing else
// needed, and constructors taking the extra
// bits otherwise.
// Everything in here ends up in a handlebars
// template.

#[derive(Debug, Serialize)]
pub struct UserDto {
  pub id: i64,
  pub display_name: String,
  pub email: String,
  pub points: i64,
  pub is_temporary_password: bool
}

impl From<&Member> for UserDto {
  fn from(member: &Member) -> Self {
    Self {
      id: member.id,
      display_name: member.display_name().to_string(),
      email: member.email.clone(),
      points: member.points,
      is_temporary_password: member.is_temporary_password
    }
  }
}

#[derive(Debug, Serialize)]
pub struct MenuItem {
  pub title: &'static str,
  pub url: String,
  pub active: bool
}

// Wraps whatever the page needs with the stuff every
// page has (header, menus, who's logged in).
#[derive(Debug, Serialize)]
pub struct PageContext<'a, T: Serialize> {
  pub site: &'a SiteInfo,
  pub user: Option<UserDto>,
  pub post_menu: Vec<MenuItem>,
  pub link_menu: Vec<MenuItem>,
  #[serde(flatten)]
  pub page: T
}

impl<'a, T: Serialize> PageContext<'a, T> {
  // "active" is the slug of the feed to highlight in the
  // menus, if any.
  pub fn new(
    site: &'a SiteInfo,
    user: Option<&Member>,
    active: &str,
    page: T
  ) -> Self {
    Self {
      site,
      user: user.map(UserDto::from),
      post_menu: POST_FEEDS.iter()
        .map(|f| MenuItem {
          title: f.title,
          url: format!("/board/{}/", f.slug),
          active: f.slug == active
        })
        .collect(),
      link_menu: LinkFeed::menu()
        .map(|f| MenuItem {
          title: f.title,
          url: format!("/links/{}/", f.slug),
          active: f.slug == active
        })
        .collect(),
      page
    }
  }
}

#[derive(Debug, Serialize)]
pub struct CategoryOption {
  pub slug: &'static str,
  pub label: &'static str,
  pub selected: bool
}

pub fn post_category_options(selected: &str) -> Vec<CategoryOption> {
  PostCategory::ALL.iter()
    .map(|c| CategoryOption {
      slug: c.slug(),
      label: c.label(),
      selected: c.slug() == selected
    })
    .collect()
}

pub fn link_category_options(selected: Option<&str>) -> Vec<CategoryOption> {
  LinkCategory::ALL.iter()
    .map(|c| CategoryOption {
      slug: c.slug(),
      label: c.label(),
      selected: Some(c.slug()) == selected
    })
    .collect()
}

#[derive(Debug, Serialize)]
pub struct FeedDto {
  pub slug: &'static str,
  pub title: &'static str,
  pub engagement: &'static str,
  // Where the "new" link of the listing goes, if any
  pub submit_url: Option<String>
}

impl From<&PostFeed> for FeedDto {
  fn from(feed: &PostFeed) -> Self {
    Self {
      slug: feed.slug,
      title: feed.title,
      engagement: feed.engagement.as_str(),
      // Posts are always created from /board/new, with
      // the category of the feed preselected.
      submit_url: if feed.slug == PostFeed::recommended().slug {
        None
      } else {
        Some(format!("/board/new?category={}", feed.default_category.slug()))
      }
    }
  }
}

impl From<&LinkFeed> for FeedDto {
  fn from(feed: &LinkFeed) -> Self {
    Self {
      slug: feed.slug,
      title: feed.title,
      // The "all" feed mixes both, each item has its own.
      engagement: "mixed",
      submit_url: if feed.accepts_submissions() {
        Some(format!("/links/{}/new", feed.slug))
      } else {
        None
      }
    }
  }
}

#[derive(Debug, Serialize)]
pub struct PostItemDto {
  pub id: i64,
  pub title: String,
  pub author: String,
  pub date: String,
  pub views: i64,
  pub comment_count: i64,
  pub category: &'static str,
  pub engagement: EngagementView
}

impl PostItemDto {
  // The feed decides which engagement gets shown.
  pub fn new(row: PostRow, engagement: Engagement) -> Self {
    Self {
      engagement: EngagementView::new(
        engagement,
        row.post.is_recommended,
        row.like_count,
        row.liked_by_viewer
      ),
      id: row.post.id,
      title: row.post.title,
      author: row.post.author,
      date: timestamp_to_date_string(row.post.created_at, DateFormat::Compact),
      views: row.post.views,
      comment_count: row.comment_count,
      category: row.post.category.slug()
    }
  }
}

#[derive(Debug, Serialize)]
pub struct ImageDto {
  pub id: i64,
  pub url: String,
  pub content_type: String
}

impl ImageDto {
  pub fn new(image: PostImage, media: &MediaStore) -> Self {
    Self {
      id: image.id,
      url: media.url(&image.file_key),
      content_type: image.content_type
    }
  }
}

#[derive(Debug, Serialize)]
pub struct CommentDto {
  pub id: i64,
  pub author: String,
  pub content: String,
  pub date: String
}

impl From<Comment> for CommentDto {
  fn from(comment: Comment) -> Self {
    Self {
      id: comment.id,
      author: comment.author,
      content: comment.content,
      date: timestamp_to_date_string(comment.created_at, DateFormat::Standard)
    }
  }
}

#[derive(Debug, Serialize)]
pub struct PostDetailDto {
  pub id: i64,
  pub title: String,
  pub content: String,
  pub author: String,
  pub date: String,
  pub views: i64,
  pub category: &'static str,
  pub category_label: &'static str,
  pub feed_url: String,
  pub engagement: EngagementView,
  pub is_owner: bool
}

impl PostDetailDto {
  pub fn new(row: PostRow, viewer: Option<&Member>) -> Self {
    let is_owner = viewer.map(|m| row.post.is_owned_by(m)).unwrap_or(false);
    Self {
      // The detail page goes by the category, whatever feed
      // the post was found in.
      engagement: EngagementView::new(
        row.post.category.engagement(),
        row.post.is_recommended,
        row.like_count,
        row.liked_by_viewer
      ),
      id: row.post.id,
      title: row.post.title,
      content: row.post.content,
      author: row.post.author,
      date: timestamp_to_date_string(row.post.created_at, DateFormat::Standard),
      views: row.post.views,
      category: row.post.category.slug(),
      category_label: row.post.category.label(),
      feed_url: format!("/board/{}/", PostFeed::for_category(row.post.category).slug),
      is_owner
    }
  }
}

#[derive(Debug, Serialize)]
pub struct LinkItemDto {
  pub id: i64,
  pub title: String,
  pub url: Option<String>,
  pub author: String,
  pub date: String,
  pub category: &'static str,
  pub category_label: &'static str,
  pub engagement: EngagementView,
  pub can_edit: bool
}

impl LinkItemDto {
  // Links always use the engagement of their category,
  // even in the feeds that mix categories.
  pub fn new(row: LinkRow, viewer: Option<&Member>) -> Self {
    let can_edit = viewer.map(|m| row.link.is_owned_by(m)).unwrap_or(false);
    Self {
      engagement: EngagementView::new(
        row.link.category.engagement(),
        row.link.is_recommended,
        row.like_count,
        row.liked_by_viewer
      ),
      id: row.link.id,
      title: row.link.title,
      url: if row.link.url.is_empty() { None } else { Some(row.link.url) },
      author: row.link.author,
      date: timestamp_to_date_string(row.link.created_at, DateFormat::Compact),
      category: row.link.category.slug(),
      category_label: row.link.category.label(),
      can_edit
    }
  }
}

#[derive(Debug, Serialize)]
pub struct HomePage {
  pub latest_posts: Vec<PostItemDto>,
  pub latest_links: Vec<LinkItemDto>,
  pub recommended_posts: Vec<PostItemDto>
}

#[derive(Debug, Serialize)]
pub struct PostListPage {
  pub feed: FeedDto,
  pub posts: Vec<PostItemDto>,
  pub pagination: PageInfo,
  pub q: Option<String>
}

#[derive(Debug, Serialize)]
pub struct PostDetailPage {
  pub post: PostDetailDto,
  pub images: Vec<ImageDto>,
  pub comments: Vec<CommentDto>,
  pub comment: String,
  pub errors: FormErrors
}

#[derive(Debug, Serialize)]
pub struct PostFormPage<'a> {
  pub action: String,
  pub post_id: Option<i64>,
  pub form: &'a super::forms::PostForm,
  pub errors: FormErrors,
  pub categories: Vec<CategoryOption>,
  pub images: Vec<ImageDto>,
  pub remaining_slots: usize
}

#[derive(Debug, Serialize)]
pub struct LinkListPage {
  pub feed: FeedDto,
  pub links: Vec<LinkItemDto>,
  pub pagination: PageInfo,
  pub q: Option<String>
}

#[derive(Debug, Serialize)]
pub struct LinkFormPage<'a> {
  pub feed: FeedDto,
  pub action: String,
  pub form: &'a super::forms::LinkForm,
  pub errors: FormErrors,
  // Only for the feeds where the category is picked
  pub categories: Option<Vec<CategoryOption>>,
  pub url_required: bool,
  pub is_edit: bool
}

// Signup, login and password reset only have a form and
// its errors.
#[derive(Debug, Serialize)]
pub struct FormPage<'a, F: Serialize> {
  pub form: &'a F,
  pub errors: FormErrors
}

#[derive(Debug, Serialize)]
pub struct PasswordResetDone {
  pub email: String,
  pub temporary_password: String
}

#[derive(Debug, Serialize)]
pub struct PasswordChangePage {
  pub errors: FormErrors,
  pub forced: bool
}

#[derive(Debug, Serialize)]
pub struct ProfilePage {
  pub nickname: Option<String>,
  pub email: String,
  pub points: i64,
  pub post_count: usize,
  pub comment_count: usize,
  pub link_count: usize
}

#[derive(Debug, Serialize)]
pub struct MatchDto {
  pub competition: String,
  pub home_team: String,
  pub away_team: String,
  pub kickoff: String,
  pub venue: Option<String>,
  pub score: Option<String>,
  pub status: String
}

impl From<SoccerMatch> for MatchDto {
  fn from(m: SoccerMatch) -> Self {
    let score = match (m.home_score, m.away_score) {
      (Some(h), Some(a)) => Some(format!("{} - {}", h, a)),
      _ => None
    };
    Self {
      competition: m.competition,
      home_team: m.home_team,
      away_team: m.away_team,
      kickoff: timestamp_to_date_string(m.kickoff, DateFormat::Standard),
      venue: m.venue,
      score,
      status: m.status
    }
  }
}

#[derive(Debug, Serialize)]
pub struct SoccerPage {
  pub matches: Vec<MatchDto>
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::board::LinkCategory;

  fn member(id: i64) -> Member {
    Member {
      id,
      email: String::from("a@b.c"),
      nickname: Some(String::from("nick")),
      points: 10,
      is_temporary_password: false
    }
  }

  fn link_row(category: LinkCategory, user_id: Option<i64>) -> LinkRow {
    let mut link = LinkPost::new(
      String::from("Title"),
      String::new(),
      category,
      String::from("nick"),
      user_id
    );
    link.id = 3;
    link.is_recommended = true;
    LinkRow {
      link,
      like_count: 4,
      liked_by_viewer: true
    }
  }

  #[test]
  fn link_item_uses_its_category_engagement() {
    let sut = LinkItemDto::new(link_row(LinkCategory::Info, None), None);
    assert_eq!(sut.engagement.model, "like");
    assert_eq!(sut.engagement.like_count, Some(4));
    assert!(sut.url.is_none());
    let sut = LinkItemDto::new(link_row(LinkCategory::Best, None), None);
    assert_eq!(sut.engagement.model, "toggle");
    assert!(sut.engagement.active);
  }

  #[test]
  fn only_the_submitter_can_edit() {
    let sut = LinkItemDto::new(link_row(LinkCategory::Best, Some(1)), Some(&member(1)));
    assert!(sut.can_edit);
    let sut = LinkItemDto::new(link_row(LinkCategory::Best, Some(1)), Some(&member(2)));
    assert!(!sut.can_edit);
    let sut = LinkItemDto::new(link_row(LinkCategory::Best, None), None);
    assert!(!sut.can_edit);
  }

  #[test]
  fn page_context_flattens_the_page() {
    let site = SiteInfo {
      title: String::from("Board"),
      upload_url: String::from("/uploads")
    };
    let sut = PageContext::new(
      &site,
      Some(&member(1)),
      "best",
      SoccerPage { matches: Vec::new() }
    );
    let json = serde_json::to_value(&sut).unwrap();
    assert!(json["matches"].is_array());
    assert_eq!(json["user"]["display_name"], "nick");
    assert!(json["link_menu"].as_array().unwrap().iter().any(|m| m["active"] == true));
  }

  #[test]
  fn submit_urls() {
    let sut = FeedDto::from(PostFeed::find("secret").unwrap());
    assert_eq!(sut.submit_url.as_deref(), Some("/board/new?category=secret"));
    assert!(FeedDto::from(PostFeed::recommended()).submit_url.is_none());
    let sut = FeedDto::from(LinkFeed::find("xart").unwrap());
    assert_eq!(sut.submit_url.as_deref(), Some("/links/xart/new"));
    assert!(FeedDto::from(LinkFeed::find("popular").unwrap()).submit_url.is_none());
  }

  #[test]
  fn score_only_when_both_are_known() {
    let mut m: SoccerMatch = serde_json::from_str(
      r#"{"competition":"Cup","home_team":"A","away_team":"B","kickoff":0}"#
    ).unwrap();
    assert!(MatchDto::from(m.clone()).score.is_none());
    m.home_score = Some(1);
    m.away_score = Some(0);
    assert_eq!(MatchDto::from(m).score, Some(String::from("1 - 0")));
  }
}
