use sha2::{Digest, Sha256};
use crate::db::entities::LinkPost;

// Hex encoded SHA-256, always that long:
pub const FINGERPRINT_LENGTH: usize = 64;

// The fingerprint is the hash of the title immediately
// followed by the URL. No separator, so ("ab", "c") and 
// ("a", "bc") are the same submission. That's on purpose,
// it's what the stored fingerprints were computed with.
pub fn fingerprint(title: &str, url: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(title.as_bytes());
  hasher.update(url.as_bytes());
  hex::encode(hasher.finalize())
}

// Only computed once. Editing the title or URL afterwards
// does NOT change the fingerprint, the stored one is kept.
pub fn ensure_fingerprint(link: &mut LinkPost) -> &str {
  if link.fingerprint.is_none() {
    link.fingerprint = Some(fingerprint(&link.title, &link.url));
  }
  link.fingerprint.as_deref().unwrap_or_default()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::board::LinkCategory;

  fn link(title: &str, url: &str) -> LinkPost {
    LinkPost::new(
      title.to_string(), 
      url.to_string(), 
      LinkCategory::Best, 
      "someone".to_string(),
      None
    )
  }

  #[test]
  fn fingerprint_is_deterministic_and_fixed_length() {
    let a = fingerprint("Example", "http://x.com");
    let b = fingerprint("Example", "http://x.com");
    assert_eq!(a, b);
    assert_eq!(a.len(), FINGERPRINT_LENGTH);
    assert_ne!(a, fingerprint("Example", "http://y.com"));
  }

  #[test]
  fn fingerprint_of_known_value() {
    // sha256("abc")
    assert_eq!(
      fingerprint("ab", "c"),
      "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
  }

  #[test]
  fn missing_url_hashes_title_only() {
    assert_eq!(fingerprint("abc", ""), fingerprint("ab", "c"));
  }

  #[test]
  fn ensure_fingerprint_is_idempotent() {
    let mut sut = link("Example", "http://x.com");
    let first = ensure_fingerprint(&mut sut).to_string();
    sut.title = String::from("Edited title");
    sut.url = String::from("http://elsewhere.com");
    let second = ensure_fingerprint(&mut sut).to_string();
    assert_eq!(first, second);
    assert_eq!(first, fingerprint("Example", "http://x.com"));
  }
}
