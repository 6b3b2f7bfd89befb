use serde::{Deserialize, Deserializer};

// Form fields left blank arrive as empty strings and not as
// missing keys, which is what I actually want for things like
// the page number or the search query.
// Use with:
// #[serde(default, deserialize_with = "serde_utils::empty_string_is_none")]
pub fn empty_string_is_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  let s: Option<String> = Option::deserialize(deserializer)?;
  Ok(empty_string_to_none(s))
}

// Plain function version, used in DTO conversions.
pub fn empty_string_to_none(value: Option<String>) -> Option<String> {
  match value {
    Some(s) => if s.trim().is_empty() 
      { None } else { Some(s) },
    None => None
  }
}
