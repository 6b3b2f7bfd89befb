/*
 * The board module holds the small amount of logic
 * that isn't just storing and fetching rows: link
 * fingerprints, which feed shows what, engagement 
 * models and pagination.
 * Nothing in here touches the database or actix.
 */

pub mod category;
pub mod engagement;
pub mod feeds;
pub mod fingerprint;
pub mod pagination;

pub use category::{LinkCategory, PostCategory, UnknownCategory};
pub use engagement::{Engagement, LikeState, Target};
pub use feeds::{LinkFeed, LinkFilter, PostFeed, PostFilter, CreateBinding};
pub use pagination::{PageInfo, Paging, PAGE_SIZE};

// A post never has more than that amount of images
// attached, be it at creation or after edits.
pub const MAX_POST_IMAGES: usize = 3;

// Points awarded to the profile of whoever does these:
pub const SIGNUP_POINTS: i64 = 10;
pub const POST_POINTS: i64 = 10;
pub const COMMENT_POINTS: i64 = 3;

// Author name used when nobody was signed in and the
// author field was left empty.
pub const ANONYMOUS_AUTHOR: &'static str = "Anonymous";

// How many images can still be attached to a post that
// already has `existing` of them.
pub fn remaining_image_slots(existing: usize) -> usize {
  MAX_POST_IMAGES.saturating_sub(existing)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn remaining_slots_never_underflow() {
    assert_eq!(remaining_image_slots(0), 3);
    assert_eq!(remaining_image_slots(2), 1);
    assert_eq!(remaining_image_slots(3), 0);
    assert_eq!(remaining_image_slots(7), 0);
  }
}
