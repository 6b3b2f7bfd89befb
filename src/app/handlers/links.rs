use actix_web::{web, HttpRequest, HttpResponse, Result};
use handlebars::Handlebars;
use log::{error, info};
use crate::board::{
  Engagement,
  LinkCategory,
  LinkFeed,
  PageInfo,
  Target,
  CreateBinding,
  ANONYMOUS_AUTHOR
};
use crate::db::{self, entities::*, WriteError};
use crate::utils::text_utils;
use crate::app::dtos::*;
use crate::app::error::{Error, map_db_error};
use crate::app::forms::{FormErrors, LinkForm, ListQuery, MAX_AUTHOR_LENGTH};
use crate::app::helpers::{redirect, redirect_back, render};
use crate::app::session::{request_path, MaybeUser};
use crate::app::AppState;

fn find_feed(slug: &str) -> Result<&'static LinkFeed, Error> {
  LinkFeed::find(slug).ok_or_else(|| Error::NotFound(String::from("Feed does not exist")))
}

fn load_link(app_state: &AppState, id: i64) -> Result<LinkPost, Error> {
  db::link_by_id(&app_state.pool, id)
    .map_err(map_db_error)?
    .ok_or_else(|| Error::NotFound(String::from("Link does not exist")))
}

fn feed_url(feed: &LinkFeed) -> String {
  format!("/links/{}/", feed.slug)
}

// Feeds that want a login want it for everything.
fn check_access(feed: &LinkFeed, user: &MaybeUser, req: &HttpRequest) -> Result<(), Error> {
  if feed.login_required && user.0.is_none() {
    return Err(Error::LoginRequired(request_path(req)));
  }
  Ok(())
}

// Whatever was typed in, otherwise whoever is signed in,
// otherwise nobody in particular.
fn author_name(form: &LinkForm, user: Option<&Member>) -> String {
  let mut author = if !form.author.is_empty() {
    form.author.clone()
  } else {
    match user {
      Some(m) => m.display_name().to_string(),
      None => ANONYMOUS_AUTHOR.to_string()
    }
  };
  text_utils::truncate_utf8(&mut author, MAX_AUTHOR_LENGTH);
  author
}

pub async fn link_list(
  app_state: web::Data<AppState>,
  hb: web::Data<Handlebars<'_>>,
  path: web::Path<(String,)>,
  query: web::Query<ListQuery>,
  user: MaybeUser,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  let feed = find_feed(&path.into_inner().0)?;
  check_access(feed, &user, &req)?;
  let search = query.search();
  let total = db::link_count(&app_state.pool, feed, search.as_deref())
    .map_err(map_db_error)?;
  let pagination = PageInfo::resolve(query.page.as_deref(), total, feed.paging);
  let links = db::links_from_to(
    &app_state.pool,
    feed,
    search.as_deref(),
    user.id(),
    pagination.offset(),
    pagination.limit()
  )
    .map_err(map_db_error)?
    .into_iter()
    .map(|row| LinkItemDto::new(row, user.0.as_ref()))
    .collect();

  render(
    &hb,
    "link_list",
    &PageContext::new(
      &app_state.site_info,
      user.0.as_ref(),
      feed.slug,
      LinkListPage {
        feed: FeedDto::from(feed),
        links,
        pagination,
        q: search
      }
    )
  )
}

// Same template for creating and editing. When editing,
// the category is whatever the link already has.
fn render_link_form(
  app_state: &AppState,
  hb: &Handlebars<'_>,
  user: Option<&Member>,
  feed: &LinkFeed,
  link: Option<&LinkPost>,
  form: &LinkForm,
  errors: FormErrors
) -> Result<HttpResponse, Error> {
  let (action, categories, url_required) = match link {
    Some(l) => (format!("/links/{}/edit", l.id), None, l.category.requires_url()),
    None => {
      let categories = match feed.create {
        CreateBinding::FromForm => Some(link_category_options(form.category.as_deref())),
        _ => None
      };
      let url_required = match feed.create {
        CreateBinding::Fixed(c) => c.requires_url(),
        _ => true
      };
      (format!("/links/{}/new", feed.slug), categories, url_required)
    }
  };
  render(
    hb,
    "link_form",
    &PageContext::new(
      &app_state.site_info,
      user,
      feed.slug,
      LinkFormPage {
        feed: FeedDto::from(feed),
        action,
        form,
        errors,
        categories,
        url_required,
        is_edit: link.is_some()
      }
    )
  )
}

pub async fn new_link_form(
  app_state: web::Data<AppState>,
  hb: web::Data<Handlebars<'_>>,
  path: web::Path<(String,)>,
  user: MaybeUser,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  let feed = find_feed(&path.into_inner().0)?;
  check_access(feed, &user, &req)?;
  if !feed.accepts_submissions() {
    return Err(Error::NotFound(String::from("This feed has no submission form")));
  }
  render_link_form(
    &app_state,
    &hb,
    user.0.as_ref(),
    feed,
    None,
    &LinkForm::default(),
    FormErrors::default()
  )
}

pub async fn create_link(
  app_state: web::Data<AppState>,
  hb: web::Data<Handlebars<'_>>,
  path: web::Path<(String,)>,
  form: web::Form<LinkForm>,
  user: MaybeUser,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  let feed = find_feed(&path.into_inner().0)?;
  check_access(feed, &user, &req)?;
  if !feed.accepts_submissions() {
    return Err(Error::NotFound(String::from("This feed has no submission form")));
  }
  let mut form = form.into_inner();
  // The category is checked first, the rest of the
  // validation depends on it.
  let category = match feed.resolve_category(form.category.as_deref()) {
    Ok(c) => c,
    Err(_) => {
      let mut errors = FormErrors::default();
      errors.field("category", "Select a valid choice.");
      return render_link_form(&app_state, &hb, user.0.as_ref(), feed, None, &form, errors);
    }
  };
  let mut errors = form.validate(category);
  if !errors.is_empty() {
    return render_link_form(&app_state, &hb, user.0.as_ref(), feed, None, &form, errors);
  }

  let mut link = LinkPost::new(
    form.title.clone(),
    form.url.clone(),
    category,
    author_name(&form, user.0.as_ref()),
    user.id()
  );
  match db::save_link_post(&app_state.pool, &mut link) {
    Ok(()) => {
      info!("Link {} submitted to {}", link.id, category);
      Ok(redirect(&feed_url(feed)))
    },
    Err(WriteError::DuplicateSubmission) => {
      errors.non_field(WriteError::DuplicateSubmission.to_string());
      render_link_form(&app_state, &hb, user.0.as_ref(), feed, None, &form, errors)
    },
    Err(e) => {
      error!("Could not save a link - {}", e);
      Err(Error::DatabaseError(String::from("Failed to save link")))
    }
  }
}

// Only whoever submitted the link while signed in can
// change it. Everybody else goes back to the listing.
fn owned_link(
  app_state: &AppState,
  id: i64,
  user: &MaybeUser,
  req: &HttpRequest
) -> Result<Result<LinkPost, HttpResponse>, Error> {
  let link = load_link(app_state, id)?;
  let member = user.0.as_ref()
    .ok_or_else(|| Error::LoginRequired(request_path(req)))?;
  if link.is_owned_by(member) {
    Ok(Ok(link))
  } else {
    Ok(Err(redirect(&feed_url(LinkFeed::for_category(link.category)))))
  }
}

pub async fn edit_link_form(
  app_state: web::Data<AppState>,
  hb: web::Data<Handlebars<'_>>,
  path: web::Path<(i64,)>,
  user: MaybeUser,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  let link = match owned_link(&app_state, path.into_inner().0, &user, &req)? {
    Ok(l) => l,
    Err(resp) => return Ok(resp)
  };
  let form = LinkForm {
    title: link.title.clone(),
    url: link.url.clone(),
    author: link.author.clone(),
    category: Some(link.category.slug().to_string())
  };
  let feed = LinkFeed::for_category(link.category);
  render_link_form(&app_state, &hb, user.0.as_ref(), feed, Some(&link), &form, FormErrors::default())
}

// The fingerprint stays what it was at creation, even if
// the title or URL change.
pub async fn update_link(
  app_state: web::Data<AppState>,
  hb: web::Data<Handlebars<'_>>,
  path: web::Path<(i64,)>,
  form: web::Form<LinkForm>,
  user: MaybeUser,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  let mut link = match owned_link(&app_state, path.into_inner().0, &user, &req)? {
    Ok(l) => l,
    Err(resp) => return Ok(resp)
  };
  let feed = LinkFeed::for_category(link.category);
  let mut form = form.into_inner();
  let mut errors = form.validate(link.category);
  if !errors.is_empty() {
    return render_link_form(&app_state, &hb, user.0.as_ref(), feed, Some(&link), &form, errors);
  }
  link.title = form.title.clone();
  link.url = form.url.clone();
  link.author = author_name(&form, user.0.as_ref());
  match db::save_link_post(&app_state.pool, &mut link) {
    Ok(()) => Ok(redirect(&feed_url(feed))),
    Err(WriteError::DuplicateSubmission) => {
      errors.non_field(WriteError::DuplicateSubmission.to_string());
      render_link_form(&app_state, &hb, user.0.as_ref(), feed, Some(&link), &form, errors)
    },
    Err(e) => {
      error!("Could not update link {} - {}", link.id, e);
      Err(Error::DatabaseError(String::from("Failed to save link")))
    }
  }
}

pub async fn delete_link(
  app_state: web::Data<AppState>,
  path: web::Path<(i64,)>,
  user: MaybeUser,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  let link = match owned_link(&app_state, path.into_inner().0, &user, &req)? {
    Ok(l) => l,
    Err(resp) => return Ok(resp)
  };
  db::delete_link_post(&app_state.pool, link.id).map_err(map_db_error)?;
  info!("Link {} deleted", link.id);
  Ok(redirect(&feed_url(LinkFeed::for_category(link.category))))
}

fn check_engagement(category: LinkCategory, expected: Engagement) -> Result<(), Error> {
  if category.engagement() != expected {
    return Err(Error::BadRequest(format!(
      "Links in {} don't use this kind of recommendation",
      category
    )));
  }
  Ok(())
}

// Global flag, anyone can flip it.
pub async fn recommend_link(
  app_state: web::Data<AppState>,
  path: web::Path<(i64,)>,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  let link = load_link(&app_state, path.into_inner().0)?;
  check_engagement(link.category, Engagement::Toggle)?;
  db::toggle_recommended(&app_state.pool, Target::Link(link.id))
    .map_err(map_db_error)?
    .ok_or_else(|| Error::NotFound(String::from("Link does not exist")))?;
  Ok(redirect_back(&req, &feed_url(LinkFeed::for_category(link.category))))
}

pub async fn like_link(
  app_state: web::Data<AppState>,
  path: web::Path<(i64,)>,
  user: MaybeUser
) -> Result<HttpResponse, Error> {
  let member = user.0.ok_or(Error::LoginRequiredJson)?;
  let link = load_link(&app_state, path.into_inner().0)?;
  check_engagement(link.category, Engagement::LikeSet)?;
  let state = db::toggle_like(&app_state.pool, Target::Link(link.id), member.id)
    .map_err(map_db_error)?
    .ok_or_else(|| Error::NotFound(String::from("Link does not exist")))?;
  Ok(HttpResponse::Ok().json(state))
}

#[cfg(test)]
mod tests {
  use actix_web::{http::{header, StatusCode}, test};
  use crate::app::test_support::*;
  use crate::board::{LinkCategory, LinkFeed};
  use crate::db::{self, entities::*};

  fn create_link(
    state: &crate::app::AppState,
    title: &str,
    url: &str,
    category: LinkCategory,
    user_id: Option<i64>
  ) -> LinkPost {
    let mut link = LinkPost::new(
      title.to_string(),
      url.to_string(),
      category,
      String::from("someone"),
      user_id
    );
    db::save_link_post(&state.pool, &mut link).unwrap();
    link
  }

  fn count_in(state: &crate::app::AppState, feed: &str) -> usize {
    db::link_count(&state.pool, LinkFeed::find(feed).unwrap(), None).unwrap()
  }

  #[actix_web::test]
  async fn anonymous_submission_lands_in_its_feed() {
    let state = test_state("link-create");
    let app = test::init_service(test_app(state.clone())).await;
    let req = test::TestRequest::post()
      .uri("/links/best/new")
      // Ignored, the feed decides
      .set_form(&[("title", "Example"), ("url", "http://x.com"), ("category", "stock")])
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/links/best/");
    assert_eq!(count_in(&state, "best"), 1);
    assert_eq!(count_in(&state, "stock"), 0);
    let rows = db::links_from_to(&state.pool, LinkFeed::find("best").unwrap(), None, None, 0, 20)
      .unwrap();
    assert_eq!(rows[0].link.author, "Anonymous");
    assert!(rows[0].link.fingerprint.is_some());
  }

  #[actix_web::test]
  async fn duplicate_submission_is_a_form_error() {
    let state = test_state("link-dup");
    create_link(&state, "Example", "http://x.com", LinkCategory::Best, None);
    let app = test::init_service(test_app(state.clone())).await;
    let req = test::TestRequest::post()
      .uri("/links/movie/new")
      .set_form(&[("title", "Example"), ("url", "http://x.com")])
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    assert!(String::from_utf8_lossy(&body).contains("This link has already been submitted."));
    assert_eq!(count_in(&state, "movie"), 0);
    assert_eq!(count_in(&state, "best"), 1);
  }

  #[actix_web::test]
  async fn invalid_form_is_rendered_again() {
    let state = test_state("link-invalid");
    let app = test::init_service(test_app(state.clone())).await;
    let req = test::TestRequest::post()
      .uri("/links/best/new")
      .set_form(&[("title", ""), ("url", "not a url")])
      .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    assert_eq!(count_in(&state, "best"), 0);
    // Info items don't need an URL
    let req = test::TestRequest::post()
      .uri("/links/info/new")
      .set_form(&[("title", "Just text")])
      .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::SEE_OTHER);
    assert_eq!(count_in(&state, "info"), 1);
  }

  #[actix_web::test]
  async fn popular_has_no_form_and_all_needs_login() {
    let state = test_state("link-feeds");
    let app = test::init_service(test_app(state.clone())).await;
    let req = test::TestRequest::get().uri("/links/popular/new").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    let req = test::TestRequest::get().uri("/links/all/").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::SEE_OTHER);
    let req = test::TestRequest::get().uri("/links/xart/").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    let req = test::TestRequest::get().uri("/links/nope/").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
  }

  #[actix_web::test]
  async fn all_feed_takes_category_from_form() {
    let state = test_state("link-all");
    let member = db::create_account(&state.pool, "a@b.cd", "hash", "poster").unwrap();
    let app = test::init_service(test_app(state.clone())).await;
    let req = test::TestRequest::post()
      .uri("/links/all/new")
      .cookie(session_cookie(&state, member.id))
      .set_form(&[("title", "Stonks"), ("url", "http://s.com"), ("category", "stock")])
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(count_in(&state, "stock"), 1);
    let rows = db::links_from_to(&state.pool, LinkFeed::find("stock").unwrap(), None, None, 0, 20)
      .unwrap();
    assert_eq!(rows[0].link.author, "poster");
    assert_eq!(rows[0].link.user_id, Some(member.id));
  }

  #[actix_web::test]
  async fn like_on_info_link() {
    let state = test_state("link-like");
    let member = db::create_account(&state.pool, "a@b.cd", "hash", "liker").unwrap();
    let link = create_link(&state, "Tip", "", LinkCategory::Info, None);
    let app = test::init_service(test_app(state.clone())).await;

    let req = test::TestRequest::post()
      .uri(&format!("/api/links/{}/like", link.id))
      .cookie(session_cookie(&state, member.id))
      .to_request();
    let sut: serde_json::Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(sut["like_count"], 1);
    assert_eq!(sut["is_liked"], true);

    let req = test::TestRequest::post()
      .uri(&format!("/api/links/{}/like", link.id))
      .cookie(session_cookie(&state, member.id))
      .to_request();
    let sut: serde_json::Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(sut["like_count"], 0);
    assert_eq!(sut["is_liked"], false);

    let req = test::TestRequest::post()
      .uri(&format!("/api/links/{}/like", link.id))
      .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
  }

  #[actix_web::test]
  async fn engagement_endpoints_are_not_interchangeable() {
    let state = test_state("link-mismatch");
    let member = db::create_account(&state.pool, "a@b.cd", "hash", "liker").unwrap();
    let info = create_link(&state, "Tip", "", LinkCategory::Info, None);
    let best = create_link(&state, "Best", "http://b.com", LinkCategory::Best, None);
    let app = test::init_service(test_app(state.clone())).await;

    let req = test::TestRequest::post()
      .uri(&format!("/links/{}/recommend", info.id))
      .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    let req = test::TestRequest::post()
      .uri(&format!("/api/links/{}/like", best.id))
      .cookie(session_cookie(&state, member.id))
      .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
  }

  #[actix_web::test]
  async fn recommend_twice_restores() {
    let state = test_state("link-recommend");
    let link = create_link(&state, "Best", "http://b.com", LinkCategory::Best, None);
    let app = test::init_service(test_app(state.clone())).await;
    let req = test::TestRequest::post()
      .uri(&format!("/links/{}/recommend", link.id))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/links/best/");
    assert_eq!(count_in(&state, "popular"), 1);
    let req = test::TestRequest::post()
      .uri(&format!("/links/{}/recommend", link.id))
      .to_request();
    test::call_service(&app, req).await;
    assert_eq!(count_in(&state, "popular"), 0);
  }

  #[actix_web::test]
  async fn only_the_submitter_edits() {
    let state = test_state("link-edit");
    let owner = db::create_account(&state.pool, "a@b.cd", "hash", "owner").unwrap();
    let other = db::create_account(&state.pool, "x@y.zz", "hash", "other").unwrap();
    let link = create_link(&state, "Old", "http://o.com", LinkCategory::Movie, Some(owner.id));
    let app = test::init_service(test_app(state.clone())).await;

    let req = test::TestRequest::post()
      .uri(&format!("/links/{}/edit", link.id))
      .cookie(session_cookie(&state, other.id))
      .set_form(&[("title", "Hijacked"), ("url", "http://o.com")])
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/links/movie/");
    assert_eq!(db::link_by_id(&state.pool, link.id).unwrap().unwrap().title, "Old");

    let req = test::TestRequest::post()
      .uri(&format!("/links/{}/edit", link.id))
      .cookie(session_cookie(&state, owner.id))
      .set_form(&[("title", "New"), ("url", "http://o.com")])
      .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::SEE_OTHER);
    let sut = db::link_by_id(&state.pool, link.id).unwrap().unwrap();
    assert_eq!(sut.title, "New");
    assert_eq!(sut.fingerprint, link.fingerprint);

    let req = test::TestRequest::post()
      .uri(&format!("/links/{}/delete", link.id))
      .cookie(session_cookie(&state, owner.id))
      .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::SEE_OTHER);
    assert!(db::link_by_id(&state.pool, link.id).unwrap().is_none());
  }
}
