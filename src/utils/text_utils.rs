use url::Url;

// Truncating a String with truncate() panics when cutting a
// multibyte char in half, and this board mostly gets Korean
// text so that would happen a lot. We count chars instead.
pub fn truncate_utf8(s: &mut String, max_chars: usize) {
  if let Some((idx, _)) = s.char_indices().nth(max_chars) {
    s.truncate(idx);
  }
}

pub fn char_count(s: &str) -> usize {
  s.chars().count()
}

// Trims in place and returns whether anything is left.
pub fn trim_in_place(s: &mut String) -> bool {
  let trimmed = s.trim();
  if trimmed.len() != s.len() {
    *s = trimmed.to_string();
  }
  !s.is_empty()
}

// Only allow redirecting to paths on this site after login.
// Browsers read "//evil.com" and "/\\evil.com" as another host, so
// the path has to resolve against a dummy origin without
// changing the host.
pub fn is_local_path(path: &str) -> bool {
  if !path.starts_with('/') || path.contains('\\')
    || path.chars().any(|c| c.is_control()) {
    return false;
  }
  let base = match Url::parse("http://localhost/") {
    Ok(base) => base,
    Err(_) => return false
  };
  match base.join(path) {
    Ok(joined) => joined.host_str() == Some("localhost")
      && joined.port().is_none()
      && joined.scheme() == "http",
    Err(_) => false
  }
}
