use actix_web::{web, HttpResponse, Result};
use handlebars::Handlebars;
use crate::board::{LinkFeed, PostCategory, PostFeed};
use crate::db;
use super::dtos::*;
use super::error::{Error, map_db_error};
use super::helpers::render;
use super::session::MaybeUser;
use super::AppState;

// Handlers are grouped by what they deal with. They
// all return a Result, see the "error" module for the
// Error to response conversions.
pub mod accounts;
pub mod links;
pub mod posts;
pub mod soccer;

// Items on the home page, per section.
const HOME_ITEMS: usize = 3;

pub async fn index(
  app_state: web::Data<AppState>,
  hb: web::Data<Handlebars<'_>>,
  user: MaybeUser
) -> Result<HttpResponse, Error> {
  let pool = &app_state.pool;
  let viewer = user.id();
  let board = PostFeed::for_category(PostCategory::Common);
  let recommended = PostFeed::recommended();

  let latest_posts = db::posts_from_to(pool, board, None, viewer, 0, HOME_ITEMS)
    .map_err(map_db_error)?
    .into_iter()
    .map(|row| PostItemDto::new(row, board.engagement))
    .collect();
  let latest_links = db::links_from_to(pool, LinkFeed::latest(), None, viewer, 0, HOME_ITEMS)
    .map_err(map_db_error)?
    .into_iter()
    .map(|row| LinkItemDto::new(row, user.0.as_ref()))
    .collect();
  let recommended_posts = db::posts_from_to(pool, recommended, None, viewer, 0, HOME_ITEMS)
    .map_err(map_db_error)?
    .into_iter()
    .map(|row| PostItemDto::new(row, recommended.engagement))
    .collect();

  render(
    &hb,
    "home",
    &PageContext::new(
      &app_state.site_info,
      user.0.as_ref(),
      "",
      HomePage {
        latest_posts,
        latest_links,
        recommended_posts
      }
    )
  )
}

// Default response when no route matched the request:
pub async fn not_found() -> Result<HttpResponse, Error> {
  Err(Error::NotFound(String::from("Page doesn't exist")))
}

#[cfg(test)]
mod tests {
  use actix_web::{http::StatusCode, test};
  use crate::app::test_support::*;

  #[actix_web::test]
  async fn home_page_renders() {
    let state = test_state("home");
    let app = test::init_service(test_app(state)).await;
    let req = test::TestRequest::get().uri("/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    assert!(String::from_utf8_lossy(&body).contains("Test board"));
  }

  #[actix_web::test]
  async fn unknown_path_is_404() {
    let state = test_state("notfound");
    let app = test::init_service(test_app(state)).await;
    let req = test::TestRequest::get().uri("/nothing/here").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }
}
