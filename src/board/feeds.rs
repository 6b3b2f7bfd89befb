use super::category::{LinkCategory, PostCategory, UnknownCategory};
use super::engagement::Engagement;
use super::pagination::{Paging, PAGE_SIZE};

// Every listing page on the board is one of these. Used
// to be one handler per menu, now the handlers take the
// feed definition and do the same thing for all of them.

// Columns the "q" search parameter looks into:
pub const LINK_SEARCH_COLUMNS: &'static [&'static str] = &["title", "url", "author"];
pub const POST_SEARCH_COLUMNS: &'static [&'static str] = &["title", "content", "author"];

// Categories aggregated by the "popular" links feed. Info 
// isn't in there, it doesn't have a recommend flag.
pub const POPULAR_CATEGORIES: &'static [LinkCategory] = &[
  LinkCategory::Best,
  LinkCategory::Xart,
  LinkCategory::Movie,
  LinkCategory::Soccer,
  LinkCategory::Baseball,
  LinkCategory::Stock
];

// The tributes feed only ever shows the latest ones:
pub const XART_TOP_N: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkFilter {
  Category(LinkCategory),
  Recommended(&'static [LinkCategory]),
  Everything
}

// Which category a link created from a given feed lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateBinding {
  // Set by the server, whatever the client sends
  Fixed(LinkCategory),
  // Taken from the submitted form
  FromForm,
  Disabled
}

#[derive(Debug)]
pub struct LinkFeed {
  pub slug: &'static str,
  pub title: &'static str,
  pub filter: LinkFilter,
  pub search_columns: &'static [&'static str],
  pub paging: Paging,
  pub login_required: bool,
  pub create: CreateBinding
}

const fn category_feed(category: LinkCategory, slug: &'static str, title: &'static str) -> LinkFeed {
  LinkFeed {
    slug,
    title,
    filter: LinkFilter::Category(category),
    search_columns: LINK_SEARCH_COLUMNS,
    paging: Paging::Paged(PAGE_SIZE),
    login_required: false,
    create: CreateBinding::Fixed(category)
  }
}

pub static LINK_FEEDS: [LinkFeed; 10] = [
  category_feed(LinkCategory::Info, "info", "Info"),
  category_feed(LinkCategory::Best, "best", "Best of"),
  LinkFeed {
    slug: "xart",
    title: "Tributes",
    filter: LinkFilter::Category(LinkCategory::Xart),
    search_columns: LINK_SEARCH_COLUMNS,
    paging: Paging::Top(XART_TOP_N),
    login_required: false,
    create: CreateBinding::Fixed(LinkCategory::Xart)
  },
  category_feed(LinkCategory::Movie, "movie", "Movies"),
  category_feed(LinkCategory::Soccer, "soccer", "Soccer news"),
  category_feed(LinkCategory::Baseball, "baseball", "Baseball news"),
  category_feed(LinkCategory::Stock, "stock", "Stock rumors"),
  LinkFeed {
    slug: "popular",
    title: "Popular",
    filter: LinkFilter::Recommended(POPULAR_CATEGORIES),
    search_columns: LINK_SEARCH_COLUMNS,
    paging: Paging::Paged(PAGE_SIZE),
    login_required: false,
    create: CreateBinding::Disabled
  },
  LinkFeed {
    slug: "all",
    title: "All links",
    filter: LinkFilter::Everything,
    search_columns: LINK_SEARCH_COLUMNS,
    paging: Paging::Paged(PAGE_SIZE),
    login_required: true,
    create: CreateBinding::FromForm
  },
  // Kept at the end, the home page uses it for "latest links"
  // and it must not require a login.
  LinkFeed {
    slug: "latest",
    title: "Latest links",
    filter: LinkFilter::Everything,
    search_columns: LINK_SEARCH_COLUMNS,
    paging: Paging::Top(3),
    login_required: false,
    create: CreateBinding::Disabled
  }
];

impl LinkFeed {

  pub fn find(slug: &str) -> Option<&'static LinkFeed> {
    LINK_FEEDS.iter().find(|f| f.slug == slug)
  }

  // The feed a link "belongs" to, where we redirect
  // after creating it for instance.
  pub fn for_category(category: LinkCategory) -> &'static LinkFeed {
    LINK_FEEDS.iter()
      .find(|f| f.filter == LinkFilter::Category(category))
      .unwrap_or(&LINK_FEEDS[0])
  }

  // Newest links of every category, for the home page.
  pub fn latest() -> &'static LinkFeed {
    &LINK_FEEDS[LINK_FEEDS.len() - 1]
  }

  // Feeds shown in the navigation menu.
  pub fn menu() -> impl Iterator<Item = &'static LinkFeed> {
    LINK_FEEDS.iter().filter(|f| f.slug != "latest")
  }

  pub fn accepts_submissions(&self) -> bool {
    self.create != CreateBinding::Disabled
  }

  // Decides the category of a link submitted through this
  // feed. Fixed feeds ignore what the client sent.
  pub fn resolve_category(
    &self, 
    submitted: Option<&str>
  ) -> Result<LinkCategory, UnknownCategory> {
    match self.create {
      CreateBinding::Fixed(category) => Ok(category),
      CreateBinding::FromForm => submitted
        .unwrap_or_default()
        .parse::<LinkCategory>(),
      CreateBinding::Disabled => Err(
        UnknownCategory(format!("{} does not accept submissions", self.slug))
      )
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
  Category(PostCategory),
  // Recommended posts, secret ones excluded
  Recommended
}

#[derive(Debug)]
pub struct PostFeed {
  pub slug: &'static str,
  pub title: &'static str,
  pub filter: PostFilter,
  pub search_columns: &'static [&'static str],
  pub paging: Paging,
  pub engagement: Engagement,
  pub login_required: bool,
  // Preselected category in the "new post" form
  pub default_category: PostCategory
}

pub static POST_FEEDS: [PostFeed; 3] = [
  PostFeed {
    slug: "board",
    title: "Free board",
    filter: PostFilter::Category(PostCategory::Common),
    search_columns: POST_SEARCH_COLUMNS,
    paging: Paging::Paged(PAGE_SIZE),
    engagement: Engagement::Toggle,
    login_required: false,
    default_category: PostCategory::Common
  },
  PostFeed {
    slug: "recommended",
    title: "Recommended",
    filter: PostFilter::Recommended,
    search_columns: POST_SEARCH_COLUMNS,
    paging: Paging::Paged(PAGE_SIZE),
    engagement: Engagement::Toggle,
    login_required: false,
    default_category: PostCategory::Common
  },
  PostFeed {
    slug: "secret",
    title: "Secret board",
    filter: PostFilter::Category(PostCategory::Secret),
    search_columns: POST_SEARCH_COLUMNS,
    paging: Paging::Paged(PAGE_SIZE),
    engagement: Engagement::LikeSet,
    login_required: true,
    default_category: PostCategory::Secret
  }
];

impl PostFeed {

  pub fn find(slug: &str) -> Option<&'static PostFeed> {
    POST_FEEDS.iter().find(|f| f.slug == slug)
  }

  pub fn for_category(category: PostCategory) -> &'static PostFeed {
    match category {
      PostCategory::Common => &POST_FEEDS[0],
      PostCategory::Secret => &POST_FEEDS[2]
    }
  }

  pub fn recommended() -> &'static PostFeed {
    &POST_FEEDS[1]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn every_link_category_has_its_feed() {
    for c in LinkCategory::ALL.iter() {
      let sut = LinkFeed::for_category(*c);
      assert_eq!(sut.filter, LinkFilter::Category(*c));
      assert_eq!(sut.slug, c.slug());
      assert_eq!(sut.create, CreateBinding::Fixed(*c));
    }
  }

  #[test]
  fn fixed_feed_ignores_submitted_category() {
    let sut = LinkFeed::find("best").unwrap();
    assert_eq!(sut.resolve_category(Some("stock")), Ok(LinkCategory::Best));
    assert_eq!(sut.resolve_category(None), Ok(LinkCategory::Best));
  }

  #[test]
  fn everything_feed_takes_category_from_form() {
    let sut = LinkFeed::find("all").unwrap();
    assert!(sut.login_required);
    assert_eq!(sut.resolve_category(Some("stock")), Ok(LinkCategory::Stock));
    assert!(sut.resolve_category(Some("nope")).is_err());
    assert!(sut.resolve_category(None).is_err());
  }

  #[test]
  fn popular_feed_is_read_only_and_skips_info() {
    let sut = LinkFeed::find("popular").unwrap();
    assert!(!sut.accepts_submissions());
    match sut.filter {
      LinkFilter::Recommended(cats) => {
        assert!(cats.contains(&LinkCategory::Best));
        assert!(!cats.contains(&LinkCategory::Info));
      },
      _ => panic!("popular should only show recommended links")
    }
  }

  #[test]
  fn xart_is_top_n() {
    let sut = LinkFeed::find("xart").unwrap();
    assert_eq!(sut.paging, Paging::Top(XART_TOP_N));
  }

  #[test]
  fn menu_hides_latest() {
    assert!(LinkFeed::menu().all(|f| f.slug != "latest"));
    assert_eq!(LinkFeed::latest().slug, "latest");
    assert!(!LinkFeed::latest().login_required);
  }

  #[test]
  fn post_feeds() {
    assert_eq!(PostFeed::for_category(PostCategory::Secret).slug, "secret");
    assert_eq!(PostFeed::for_category(PostCategory::Common).slug, "board");
    assert_eq!(PostFeed::recommended().filter, PostFilter::Recommended);
    assert!(PostFeed::find("secret").unwrap().login_required);
    assert_eq!(PostFeed::find("secret").unwrap().engagement, Engagement::LikeSet);
    assert!(PostFeed::find("nope").is_none());
  }
}
