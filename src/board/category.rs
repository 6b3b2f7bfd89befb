use std::fmt;
use std::str::FromStr;
use derive_more::Display;
use super::engagement::Engagement;

// Category tags are stored as their slug in the database,
// which is also what shows up in URLs and forms.

#[derive(Debug, Display, PartialEq)]
#[display(fmt = "Unknown category: {}", _0)]
pub struct UnknownCategory(pub String);

impl std::error::Error for UnknownCategory {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostCategory {
  Common,
  Secret
}

impl PostCategory {
  pub const ALL: [PostCategory; 2] = [PostCategory::Common, PostCategory::Secret];

  pub fn slug(self) -> &'static str {
    match self {
      PostCategory::Common => "common",
      PostCategory::Secret => "secret"
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      PostCategory::Common => "Free board",
      PostCategory::Secret => "Secret board"
    }
  }

  // Secret posts came later and only exist with the
  // per-user likes.
  pub fn engagement(self) -> Engagement {
    match self {
      PostCategory::Common => Engagement::Toggle,
      PostCategory::Secret => Engagement::LikeSet
    }
  }

  pub fn requires_login(self) -> bool {
    self == PostCategory::Secret
  }
}

impl Default for PostCategory {
  fn default() -> Self {
    PostCategory::Common
  }
}

impl fmt::Display for PostCategory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.slug())
  }
}

impl FromStr for PostCategory {
  type Err = UnknownCategory;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    PostCategory::ALL.iter()
      .copied()
      .find(|c| c.slug() == s.trim())
      .ok_or_else(|| UnknownCategory(s.to_string()))
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkCategory {
  Info,
  Best,
  Xart,
  Movie,
  Soccer,
  Baseball,
  Stock
}

impl LinkCategory {
  pub const ALL: [LinkCategory; 7] = [
    LinkCategory::Info,
    LinkCategory::Best,
    LinkCategory::Xart,
    LinkCategory::Movie,
    LinkCategory::Soccer,
    LinkCategory::Baseball,
    LinkCategory::Stock
  ];

  pub fn slug(self) -> &'static str {
    match self {
      LinkCategory::Info => "info",
      LinkCategory::Best => "best",
      LinkCategory::Xart => "xart",
      LinkCategory::Movie => "movie",
      LinkCategory::Soccer => "soccer",
      LinkCategory::Baseball => "baseball",
      LinkCategory::Stock => "stock"
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      LinkCategory::Info => "Info",
      LinkCategory::Best => "Best of",
      LinkCategory::Xart => "Tributes",
      LinkCategory::Movie => "Movies",
      LinkCategory::Soccer => "Soccer news",
      LinkCategory::Baseball => "Baseball news",
      LinkCategory::Stock => "Stock rumors"
    }
  }

  // Info items were moved to per-user likes, the other
  // categories never got migrated and still use the 
  // global recommend flag.
  pub fn engagement(self) -> Engagement {
    match self {
      LinkCategory::Info => Engagement::LikeSet,
      _ => Engagement::Toggle
    }
  }

  // Info items can be plain text with no link.
  pub fn requires_url(self) -> bool {
    self != LinkCategory::Info
  }
}

impl Default for LinkCategory {
  fn default() -> Self {
    LinkCategory::Info
  }
}

impl fmt::Display for LinkCategory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.slug())
  }
}

impl FromStr for LinkCategory {
  type Err = UnknownCategory;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    LinkCategory::ALL.iter()
      .copied()
      .find(|c| c.slug() == s.trim())
      .ok_or_else(|| UnknownCategory(s.to_string()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn link_category_slugs_round_trip() {
    for c in LinkCategory::ALL.iter() {
      assert_eq!(c.slug().parse::<LinkCategory>(), Ok(*c));
    }
  }

  #[test]
  fn unknown_link_category_is_an_error() {
    let sut = "politics".parse::<LinkCategory>();
    assert_eq!(sut, Err(UnknownCategory("politics".to_string())));
  }

  #[test]
  fn only_info_links_use_like_sets() {
    let like_sets: Vec<LinkCategory> = LinkCategory::ALL.iter()
      .copied()
      .filter(|c| c.engagement() == Engagement::LikeSet)
      .collect();
    assert_eq!(like_sets, vec![LinkCategory::Info]);
  }

  #[test]
  fn defaults() {
    assert_eq!(PostCategory::default(), PostCategory::Common);
    assert_eq!(LinkCategory::default(), LinkCategory::Info);
    assert!(!LinkCategory::Info.requires_url());
    assert!(LinkCategory::Best.requires_url());
  }

  #[test]
  fn post_category_parses_with_whitespace() {
    assert_eq!(" secret ".parse::<PostCategory>(), Ok(PostCategory::Secret));
  }
}
