use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use regex::Regex;
use lazy_static::lazy_static;
use url::Url;
use crate::board::{LinkCategory, PostCategory};
use crate::utils::{serde_utils, text_utils};

pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_NICKNAME_LENGTH: usize = 20;
pub const MAX_AUTHOR_LENGTH: usize = 20;
pub const MAX_COMMENT_LENGTH: usize = 2000;
pub const MAX_SEARCH_LENGTH: usize = 100;

const REQUIRED: &'static str = "This field is required.";

// What a form page shows when the submitted data isn't
// right. Field errors go next to their input, the others
// on top of the form.
#[derive(Debug, Default, Serialize)]
pub struct FormErrors {
  pub fields: BTreeMap<&'static str, String>,
  pub non_field: Vec<String>
}

impl FormErrors {
  pub fn field(&mut self, name: &'static str, message: impl Into<String>) {
    // First error for a field wins.
    self.fields.entry(name).or_insert_with(|| message.into());
  }

  pub fn non_field(&mut self, message: impl Into<String>) {
    self.non_field.push(message.into());
  }

  pub fn is_empty(&self) -> bool {
    self.fields.is_empty() && self.non_field.is_empty()
  }

  pub fn has_field(&self, name: &str) -> bool {
    self.fields.contains_key(name)
  }
}

fn required_with_max(
  errors: &mut FormErrors,
  name: &'static str,
  value: &mut String,
  max: usize
) {
  if !text_utils::trim_in_place(value) {
    errors.field(name, REQUIRED);
  } else if text_utils::char_count(value) > max {
    errors.field(name, format!("Ensure this value has at most {} characters.", max));
  }
}

pub fn is_valid_email(email: &str) -> bool {
  // Since there's no way to define a const that uses
  // the heap, we need that weird lazy_static crate.
  lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(
      r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$"
    ).unwrap();
  }
  EMAIL_REGEX.is_match(email)
}

fn validate_email(errors: &mut FormErrors, email: &mut String) {
  if !text_utils::trim_in_place(email) {
    errors.field("email", REQUIRED);
  } else if !is_valid_email(email) {
    errors.field("email", "Enter a valid email address.");
  }
}

// Only absolute http(s) URLs.
pub fn is_valid_link_url(value: &str) -> bool {
  match Url::parse(value) {
    Ok(u) => (u.scheme() == "http" || u.scheme() == "https") && u.host_str().is_some(),
    Err(_) => false
  }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ListQuery {
  #[serde(default, deserialize_with = "serde_utils::empty_string_is_none")]
  pub q: Option<String>,
  #[serde(default, deserialize_with = "serde_utils::empty_string_is_none")]
  pub page: Option<String>
}

impl ListQuery {
  pub fn search(&self) -> Option<String> {
    self.q.as_ref().map(|q| {
      let mut q = q.trim().to_string();
      text_utils::truncate_utf8(&mut q, MAX_SEARCH_LENGTH);
      q
    })
  }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LinkForm {
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub url: String,
  #[serde(default)]
  pub author: String,
  // Only read by the feeds that let you pick
  #[serde(default, deserialize_with = "serde_utils::empty_string_is_none")]
  pub category: Option<String>
}

impl LinkForm {
  // Normalizes the fields in place, they're shown again
  // if anything is wrong.
  pub fn validate(&mut self, category: LinkCategory) -> FormErrors {
    let mut errors = FormErrors::default();
    required_with_max(&mut errors, "title", &mut self.title, MAX_TITLE_LENGTH);
    text_utils::trim_in_place(&mut self.url);
    if self.url.is_empty() {
      if category.requires_url() {
        errors.field("url", REQUIRED);
      }
    } else if !is_valid_link_url(&self.url) {
      errors.field("url", "Enter a valid URL.");
    }
    text_utils::trim_in_place(&mut self.author);
    if text_utils::char_count(&self.author) > MAX_AUTHOR_LENGTH {
      errors.field(
        "author",
        format!("Ensure this value has at most {} characters.", MAX_AUTHOR_LENGTH)
      );
    }
    errors
  }
}

// Filled by hand from the multipart stream.
#[derive(Debug, Default, Serialize)]
pub struct PostForm {
  pub title: String,
  pub content: String,
  pub category: String
}

impl PostForm {
  pub fn validate(&mut self) -> (Option<PostCategory>, FormErrors) {
    let mut errors = FormErrors::default();
    required_with_max(&mut errors, "title", &mut self.title, MAX_TITLE_LENGTH);
    if !text_utils::trim_in_place(&mut self.content) {
      errors.field("content", REQUIRED);
    }
    let category = if self.category.trim().is_empty() {
      Some(PostCategory::default())
    } else {
      self.category.parse::<PostCategory>().ok()
    };
    if category.is_none() {
      errors.field("category", "Select a valid choice.");
    }
    (category, errors)
  }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct CommentForm {
  #[serde(default)]
  pub content: String
}

impl CommentForm {
  pub fn validate(&mut self) -> FormErrors {
    let mut errors = FormErrors::default();
    required_with_max(&mut errors, "content", &mut self.content, MAX_COMMENT_LENGTH);
    errors
  }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SignupForm {
  #[serde(default)]
  pub email: String,
  // Never sent back to the page
  #[serde(default, skip_serializing)]
  pub password: String,
  #[serde(default)]
  pub nickname: String
}

impl SignupForm {
  // Uniqueness is checked by the handler, it needs the
  // database.
  pub fn validate(&mut self) -> FormErrors {
    let mut errors = FormErrors::default();
    validate_email(&mut errors, &mut self.email);
    if self.password.is_empty() {
      errors.field("password", REQUIRED);
    }
    required_with_max(&mut errors, "nickname", &mut self.nickname, MAX_NICKNAME_LENGTH);
    errors
  }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LoginForm {
  #[serde(default)]
  pub email: String,
  #[serde(default, skip_serializing)]
  pub password: String,
  #[serde(default, deserialize_with = "serde_utils::empty_string_is_none")]
  pub next: Option<String>
}

impl LoginForm {
  pub fn validate(&mut self) -> FormErrors {
    let mut errors = FormErrors::default();
    validate_email(&mut errors, &mut self.email);
    if self.password.is_empty() {
      errors.field("password", REQUIRED);
    }
    errors
  }

  // Where to go after logging in. Anything that isn't a
  // path on this site is ignored.
  pub fn redirect_target(&self) -> &str {
    match self.next.as_deref() {
      Some(next) if text_utils::is_local_path(next) => next,
      _ => "/"
    }
  }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PasswordResetForm {
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub nickname: String
}

impl PasswordResetForm {
  pub fn validate(&mut self) -> FormErrors {
    let mut errors = FormErrors::default();
    validate_email(&mut errors, &mut self.email);
    required_with_max(&mut errors, "nickname", &mut self.nickname, MAX_NICKNAME_LENGTH);
    errors
  }
}

#[derive(Debug, Default, Deserialize)]
pub struct PasswordChangeForm {
  #[serde(default)]
  pub new_password: String,
  #[serde(default)]
  pub confirm_password: String
}

impl PasswordChangeForm {
  pub fn validate(&self) -> FormErrors {
    let mut errors = FormErrors::default();
    if self.new_password.is_empty() {
      errors.field("new_password", REQUIRED);
    }
    if self.confirm_password.is_empty() {
      errors.field("confirm_password", REQUIRED);
    }
    if errors.is_empty() && self.new_password != self.confirm_password {
      errors.non_field("The two passwords do not match.");
    }
    errors
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn link_form(title: &str, url: &str, author: &str) -> LinkForm {
    LinkForm {
      title: title.to_string(),
      url: url.to_string(),
      author: author.to_string(),
      category: None
    }
  }

  #[test]
  fn emails() {
    assert!(is_valid_email("someone@example.com"));
    assert!(is_valid_email("first.last+tag@mail.example.co.kr"));
    assert!(!is_valid_email("someone@"));
    assert!(!is_valid_email("someone example.com"));
    assert!(!is_valid_email("a@b"));
  }

  #[test]
  fn link_urls() {
    assert!(is_valid_link_url("http://x.com"));
    assert!(is_valid_link_url("https://x.com/a?b=c"));
    assert!(!is_valid_link_url("javascript:alert(1)"));
    assert!(!is_valid_link_url("x.com"));
  }

  #[test]
  fn link_form_trims_and_checks() {
    let mut sut = link_form("  Example  ", " http://x.com ", "");
    assert!(sut.validate(LinkCategory::Best).is_empty());
    assert_eq!(sut.title, "Example");
    assert_eq!(sut.url, "http://x.com");
  }

  #[test]
  fn info_links_do_not_need_an_url() {
    let mut sut = link_form("News", "", "");
    assert!(sut.validate(LinkCategory::Info).is_empty());
    let mut sut = link_form("News", "", "");
    assert!(sut.validate(LinkCategory::Movie).has_field("url"));
  }

  #[test]
  fn link_form_lengths() {
    let long_title = "가".repeat(MAX_TITLE_LENGTH + 1);
    let mut sut = link_form(&long_title, "http://x.com", &"a".repeat(21));
    let errors = sut.validate(LinkCategory::Best);
    assert!(errors.has_field("title"));
    assert!(errors.has_field("author"));
    let mut sut = link_form(&"가".repeat(MAX_TITLE_LENGTH), "http://x.com", "");
    assert!(sut.validate(LinkCategory::Best).is_empty());
  }

  #[test]
  fn post_form_category() {
    let mut sut = PostForm {
      title: String::from("t"),
      content: String::from("c"),
      category: String::new()
    };
    let (category, errors) = sut.validate();
    assert!(errors.is_empty());
    assert_eq!(category, Some(PostCategory::Common));
    sut.category = String::from("bogus");
    let (category, errors) = sut.validate();
    assert!(category.is_none());
    assert!(errors.has_field("category"));
  }

  #[test]
  fn password_change_mismatch() {
    let sut = PasswordChangeForm {
      new_password: String::from("a"),
      confirm_password: String::from("b")
    };
    let errors = sut.validate();
    assert_eq!(errors.non_field.len(), 1);
    assert!(errors.fields.is_empty());
  }

  #[test]
  fn login_redirect_target_is_local() {
    let mut sut = LoginForm::default();
    sut.next = Some(String::from("/board/3"));
    assert_eq!(sut.redirect_target(), "/board/3");
    sut.next = Some(String::from("https://evil.com"));
    assert_eq!(sut.redirect_target(), "/");
    sut.next = None;
    assert_eq!(sut.redirect_target(), "/");
  }

  #[test]
  fn signup_form_does_not_echo_password() {
    let sut = SignupForm {
      email: String::from("a@b.cd"),
      password: String::from("hunter22"),
      nickname: String::from("nick")
    };
    let json = serde_json::to_string(&sut).unwrap();
    assert!(!json.contains("hunter22"));
  }

  #[test]
  fn search_is_trimmed() {
    let sut = ListQuery { q: Some(String::from("  rust  ")), page: None };
    assert_eq!(sut.search(), Some(String::from("rust")));
  }
}
