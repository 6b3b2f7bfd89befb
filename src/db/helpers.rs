// Small SQL string helpers.

// "?, ?, ?" for IN clauses.
pub fn generate_in_placeholders(count: usize) -> String {
  vec!["?"; count].join(", ")
}

// Builds the case insensitive "contains" search clause
// over a few columns. Every column gets its own parameter,
// that parameter should come from like_pattern().
pub fn search_clause(alias: &str, columns: &[&str]) -> String {
  let parts: Vec<String> = columns.iter()
    .map(|c| format!("{}.{} LIKE ? ESCAPE '\\'", alias, c))
    .collect();
  format!("({})", parts.join(" OR "))
}

// SQLite LIKE is already case insensitive for ASCII. We have
// to escape the wildcards users might type though.
pub fn like_pattern(terms: &str) -> String {
  let mut escaped = String::with_capacity(terms.len() + 2);
  escaped.push('%');
  for c in terms.chars() {
    if c == '%' || c == '_' || c == '\\' {
      escaped.push('\\');
    }
    escaped.push(c);
  }
  escaped.push('%');
  escaped
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn generate_in_list() {
    assert_eq!(generate_in_placeholders(3), "?, ?, ?");
    assert_eq!(generate_in_placeholders(1), "?");
  }

  #[test]
  fn search_clause_over_three_columns() {
    let sut = search_clause("l", &["title", "url", "author"]);
    assert_eq!(
      sut,
      "(l.title LIKE ? ESCAPE '\\' OR l.url LIKE ? ESCAPE '\\' OR l.author LIKE ? ESCAPE '\\')"
    );
  }

  #[test]
  fn like_pattern_escapes_wildcards() {
    assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    assert_eq!(like_pattern("rust"), "%rust%");
  }
}
