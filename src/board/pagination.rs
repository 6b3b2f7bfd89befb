use serde::Serialize;

// Most feeds show that many items per page.
pub const PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paging {
  // Regular pages of that size
  Paged(usize),
  // No pages at all, only the N most recent items
  Top(usize)
}

// What the templates need to draw the page links. Page 
// numbers start at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageInfo {
  pub number: usize,
  pub num_pages: usize,
  pub total: usize,
  pub per_page: usize,
  pub has_previous: bool,
  pub has_next: bool,
  pub previous: usize,
  pub next: usize,
  pub paginated: bool
}

impl PageInfo {

  // Anything that isn't a number gives the first page,
  // anything out of range gives the closest valid page.
  // We never error on a bad page number.
  pub fn resolve(requested: Option<&str>, total: usize, paging: Paging) -> Self {
    match paging {
      Paging::Top(max) => Self::top(total, max),
      Paging::Paged(per_page) => {
        let per_page = per_page.max(1);
        // An empty listing still has one (empty) page.
        let num_pages = ((total + per_page - 1) / per_page).max(1);
        let number = requested
          .and_then(|p| requested_page(p.trim(), num_pages))
          .unwrap_or(1);
        Self {
          number,
          num_pages,
          total,
          per_page,
          has_previous: number > 1,
          has_next: number < num_pages,
          previous: if number > 1 { number - 1 } else { 1 },
          next: if number < num_pages { number + 1 } else { num_pages },
          paginated: true
        }
      }
    }
  }

  fn top(total: usize, max: usize) -> Self {
    Self {
      number: 1,
      num_pages: 1,
      total: total.min(max),
      per_page: max,
      has_previous: false,
      has_next: false,
      previous: 1,
      next: 1,
      paginated: false
    }
  }

  // Index of the first item on this page.
  pub fn offset(&self) -> usize {
    (self.number - 1) * self.per_page
  }

  pub fn limit(&self) -> usize {
    self.per_page
  }
}

// A number too large for i64 is still a number, and
// is past the last page.
fn requested_page(page: &str, num_pages: usize) -> Option<usize> {
  match page.parse::<i64>() {
    Ok(p) => Some(p.clamp(1, num_pages as i64) as usize),
    Err(_) => {
      let digits = page.strip_prefix('+').unwrap_or(page);
      if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        Some(num_pages)
      } else if page.len() > 1 && page.starts_with('-')
        && page[1..].bytes().all(|b| b.is_ascii_digit()) {
        Some(1)
      } else {
        None
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn first_page_by_default() {
    let sut = PageInfo::resolve(None, 45, Paging::Paged(20));
    assert_eq!(sut.number, 1);
    assert_eq!(sut.num_pages, 3);
    assert_eq!(sut.offset(), 0);
    assert!(!sut.has_previous);
    assert!(sut.has_next);
  }

  #[test]
  fn garbage_page_gives_first_page() {
    let sut = PageInfo::resolve(Some("lol"), 45, Paging::Paged(20));
    assert_eq!(sut.number, 1);
  }

  #[test]
  fn out_of_range_page_gives_last_page() {
    let sut = PageInfo::resolve(Some("99"), 45, Paging::Paged(20));
    assert_eq!(sut.number, 3);
    assert_eq!(sut.offset(), 40);
    assert!(!sut.has_next);
    assert_eq!(sut.next, 3);
    assert_eq!(sut.previous, 2);
  }

  #[test]
  fn huge_page_gives_last_page() {
    let sut = PageInfo::resolve(Some("99999999999999999999"), 45, Paging::Paged(20));
    assert_eq!(sut.number, 3);
    let sut = PageInfo::resolve(Some("-99999999999999999999"), 45, Paging::Paged(20));
    assert_eq!(sut.number, 1);
  }

  #[test]
  fn zero_and_negative_pages_give_first_page() {
    assert_eq!(PageInfo::resolve(Some("0"), 45, Paging::Paged(20)).number, 1);
    assert_eq!(PageInfo::resolve(Some("-4"), 45, Paging::Paged(20)).number, 1);
  }

  #[test]
  fn empty_listing_has_one_page() {
    let sut = PageInfo::resolve(Some("2"), 0, Paging::Paged(20));
    assert_eq!(sut.number, 1);
    assert_eq!(sut.num_pages, 1);
    assert_eq!(sut.offset(), 0);
  }

  #[test]
  fn top_n_is_not_paginated() {
    let sut = PageInfo::resolve(Some("3"), 100, Paging::Top(30));
    assert_eq!(sut.number, 1);
    assert_eq!(sut.offset(), 0);
    assert_eq!(sut.limit(), 30);
    assert_eq!(sut.total, 30);
    assert!(!sut.paginated);
  }
}
