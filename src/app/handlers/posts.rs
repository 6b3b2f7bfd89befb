use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse, Result};
use futures::TryStreamExt;
use handlebars::Handlebars;
use log::{error, info, warn};
use crate::board::{
  remaining_image_slots,
  PageInfo,
  PostCategory,
  PostFeed,
  Target,
  MAX_POST_IMAGES
};
use crate::db::{self, entities::*, WriteError};
use crate::utils::time_utils;
use crate::app::dtos::*;
use crate::app::error::{Error, map_db_error};
use crate::app::forms::{CommentForm, FormErrors, ListQuery, PostForm};
use crate::app::helpers::{redirect, redirect_back, render};
use crate::app::media::extension_for;
use crate::app::session::{request_path, CurrentUser, MaybeUser};
use crate::app::AppState;

// An image read from the multipart body, not stored yet.
struct Upload {
  data: Vec<u8>,
  content_type: String
}

// Everything the post form sends. Text fields can't be
// bigger than an image either.
struct PostSubmission {
  form: PostForm,
  uploads: Vec<Upload>,
  // Images past the maximum, counted but not kept
  extra_images: usize,
  errors: FormErrors
}

impl PostSubmission {
  fn image_count(&self) -> usize {
    self.uploads.len() + self.extra_images
  }
}

// Whole body limit: every image at its max size plus
// room for the text fields.
fn max_body_size(max_size: usize) -> usize {
  max_size.saturating_mul(MAX_POST_IMAGES + 2)
}

// Reads the multipart form in memory. Nothing is
// written anywhere until the form is validated, so that
// rejected forms don't leave files behind. Only the
// first MAX_POST_IMAGES images are kept.
async fn read_post_submission(
  mut payload: Multipart,
  max_size: usize
) -> Result<PostSubmission, Error> {
  let mut submission = PostSubmission {
    form: PostForm::default(),
    uploads: Vec::new(),
    extra_images: 0,
    errors: FormErrors::default()
  };
  let max_body = max_body_size(max_size);
  let mut body_size: usize = 0;
  while let Some(mut field) = payload.try_next().await.map_err(|e| {
    warn!("Invalid multipart body - {}", e);
    Error::BadRequest(String::from("Invalid multipart body"))
  })? {
    let name = field.content_disposition().get_name().unwrap_or_default().to_string();
    let has_filename = field.content_disposition()
      .get_filename()
      .map(|f| !f.is_empty())
      .unwrap_or(false);
    let content_type = field.content_type()
      .map(|m| m.essence_str().to_string())
      .unwrap_or_default();
    let discard = name == "images" && submission.uploads.len() >= MAX_POST_IMAGES;
    let mut data: Vec<u8> = Vec::new();
    let mut field_size: usize = 0;
    while let Some(chunk) = field.try_next().await.map_err(|e| {
      warn!("Invalid multipart field - {}", e);
      Error::BadRequest(String::from("Invalid multipart body"))
    })? {
      body_size += chunk.len();
      if body_size > max_body {
        warn!("Post form bigger than {} bytes refused", max_body);
        return Err(Error::BadRequest(String::from("Post form is too large")));
      }
      field_size += chunk.len();
      // Have to keep reading until the end of the field
      // even when we don't want it.
      if discard || field_size > max_size {
        continue;
      }
      data.extend_from_slice(&chunk);
    }
    let too_large = field_size > max_size;
    match name.as_str() {
      "title" => submission.form.title = String::from_utf8_lossy(&data).into_owned(),
      "content" => submission.form.content = String::from_utf8_lossy(&data).into_owned(),
      "category" => submission.form.category = String::from_utf8_lossy(&data).into_owned(),
      // Browsers send an empty file part when no file was picked.
      "images" if has_filename || field_size > 0 => {
        if field_size == 0 {
          continue;
        } else if discard {
          submission.extra_images += 1;
        } else if too_large {
          submission.errors.field(
            "images",
            format!("Images can't be bigger than {} bytes.", max_size)
          );
        } else if extension_for(&content_type).is_none() {
          submission.errors.field("images", "Only PNG, JPEG, GIF and WebP images are accepted.");
        } else {
          submission.uploads.push(Upload { data, content_type });
        }
      },
      _ => ()
    }
  }
  Ok(submission)
}

// On failure the files already written are removed
// again.
fn store_uploads(app_state: &AppState, uploads: &[Upload]) -> Result<Vec<NewImage>, Error> {
  let mut images = Vec::with_capacity(uploads.len());
  for upload in uploads {
    let error = match app_state.media.save(&upload.data, &upload.content_type) {
      Ok(Some(image)) => {
        images.push(image);
        continue;
      },
      Ok(None) => Error::BadRequest(String::from("Unsupported image type")),
      Err(e) => {
        error!("Could not store an uploaded image - {:?}", e);
        Error::InternalServerError(String::from("Could not store image"))
      }
    };
    cleanup_images(app_state, &images);
    return Err(error);
  }
  Ok(images)
}

// Files just stored for a write that didn't happen.
fn cleanup_images(app_state: &AppState, images: &[NewImage]) {
  let keys: Vec<String> = images.iter().map(|i| i.file_key.clone()).collect();
  cleanup_files(app_state, &keys);
}

// Removes the files nobody points to anymore. Failing
// to do so is not worth failing the request.
fn cleanup_files(app_state: &AppState, file_keys: &[String]) {
  for key in file_keys {
    if let Err(e) = app_state.media.remove_if_unused(&app_state.pool, key) {
      error!("Could not remove image file {} - {:?}", key, e);
    }
  }
}

fn too_many_images_message(existing: usize) -> String {
  WriteError::TooManyImages(MAX_POST_IMAGES, existing).to_string()
}

fn load_post(app_state: &AppState, id: i64) -> Result<Post, Error> {
  db::post_by_id(&app_state.pool, id)
    .map_err(map_db_error)?
    .ok_or_else(|| Error::NotFound(String::from("Post does not exist")))
}

fn detail_url(id: i64) -> String {
  format!("/board/{}", id)
}

pub async fn post_list(
  app_state: web::Data<AppState>,
  hb: web::Data<Handlebars<'_>>,
  path: web::Path<(String,)>,
  query: web::Query<ListQuery>,
  user: MaybeUser,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  let feed = PostFeed::find(&path.into_inner().0)
    .ok_or_else(|| Error::NotFound(String::from("Board does not exist")))?;
  if feed.login_required && user.0.is_none() {
    return Err(Error::LoginRequired(request_path(&req)));
  }
  let search = query.search();
  let total = db::post_count(&app_state.pool, feed, search.as_deref())
    .map_err(map_db_error)?;
  let pagination = PageInfo::resolve(query.page.as_deref(), total, feed.paging);
  let posts = db::posts_from_to(
    &app_state.pool,
    feed,
    search.as_deref(),
    user.id(),
    pagination.offset(),
    pagination.limit()
  )
    .map_err(map_db_error)?
    .into_iter()
    .map(|row| PostItemDto::new(row, feed.engagement))
    .collect();

  render(
    &hb,
    "post_list",
    &PageContext::new(
      &app_state.site_info,
      user.0.as_ref(),
      feed.slug,
      PostListPage {
        feed: FeedDto::from(feed),
        posts,
        pagination,
        q: search
      }
    )
  )
}

fn render_post_form(
  app_state: &AppState,
  hb: &Handlebars<'_>,
  user: &Member,
  post: Option<&Post>,
  form: &PostForm,
  errors: FormErrors
) -> Result<HttpResponse, Error> {
  let (action, images) = match post {
    Some(p) => (
      format!("/board/{}/edit", p.id),
      db::post_images(&app_state.pool, p.id)
        .map_err(map_db_error)?
        .into_iter()
        .map(|i| ImageDto::new(i, &app_state.media))
        .collect::<Vec<ImageDto>>()
    ),
    None => (String::from("/board/new"), Vec::new())
  };
  let remaining_slots = remaining_image_slots(images.len());
  render(
    hb,
    "post_form",
    &PageContext::new(
      &app_state.site_info,
      Some(user),
      "",
      PostFormPage {
        action,
        post_id: post.map(|p| p.id),
        form,
        errors,
        categories: post_category_options(&form.category),
        images,
        remaining_slots
      }
    )
  )
}

#[derive(serde::Deserialize)]
pub struct NewPostQuery {
  pub category: Option<String>
}

pub async fn new_post_form(
  app_state: web::Data<AppState>,
  hb: web::Data<Handlebars<'_>>,
  query: web::Query<NewPostQuery>,
  user: CurrentUser
) -> Result<HttpResponse, Error> {
  // The secret board link preselects its category.
  let category = query.category.as_deref()
    .and_then(|c| c.parse::<PostCategory>().ok())
    .unwrap_or_default();
  let form = PostForm {
    category: category.slug().to_string(),
    ..PostForm::default()
  };
  render_post_form(&app_state, &hb, &user.0, None, &form, FormErrors::default())
}

pub async fn create_post(
  app_state: web::Data<AppState>,
  hb: web::Data<Handlebars<'_>>,
  payload: Multipart,
  user: CurrentUser
) -> Result<HttpResponse, Error> {
  let submission = read_post_submission(payload, app_state.max_upload_size).await?;
  let image_count = submission.image_count();
  let PostSubmission { mut form, uploads, mut errors, .. } = submission;
  let (category, form_errors) = form.validate();
  errors.fields.extend(form_errors.fields);
  if image_count > MAX_POST_IMAGES {
    errors.non_field(too_many_images_message(0));
  }
  let category = match category {
    Some(c) if errors.is_empty() => c,
    _ => return render_post_form(&app_state, &hb, &user.0, None, &form, errors)
  };

  let images = store_uploads(&app_state, &uploads)?;
  let mut post = Post::new(
    form.title.clone(),
    form.content.clone(),
    category,
    user.0.display_name().to_string(),
    Some(user.0.id)
  );
  match db::insert_post(&app_state.pool, &mut post, &images) {
    Ok(()) => {
      info!("Post {} created by user {}", post.id, user.0.id);
      Ok(redirect(&detail_url(post.id)))
    },
    Err(WriteError::TooManyImages(_, existing)) => {
      cleanup_images(&app_state, &images);
      errors.non_field(too_many_images_message(existing));
      render_post_form(&app_state, &hb, &user.0, None, &form, errors)
    },
    Err(e) => {
      cleanup_images(&app_state, &images);
      error!("Could not insert a post - {}", e);
      Err(Error::DatabaseError(String::from("Failed to insert post")))
    }
  }
}

fn render_detail(
  app_state: &AppState,
  hb: &Handlebars<'_>,
  id: i64,
  user: Option<&Member>,
  comment: String,
  errors: FormErrors
) -> Result<HttpResponse, Error> {
  let pool = &app_state.pool;
  let row = db::post_row_by_id(pool, id, user.map(|m| m.id))
    .map_err(map_db_error)?
    .ok_or_else(|| Error::NotFound(String::from("Post does not exist")))?;
  let images = db::post_images(pool, id)
    .map_err(map_db_error)?
    .into_iter()
    .map(|i| ImageDto::new(i, &app_state.media))
    .collect();
  let comments = db::comments_for_post(pool, id)
    .map_err(map_db_error)?
    .into_iter()
    .map(CommentDto::from)
    .collect();
  let active = PostFeed::for_category(row.post.category).slug;
  render(
    hb,
    "post_detail",
    &PageContext::new(
      &app_state.site_info,
      user,
      active,
      PostDetailPage {
        post: PostDetailDto::new(row, user),
        images,
        comments,
        comment,
        errors
      }
    )
  )
}

// Every GET counts as a view.
pub async fn post_detail(
  app_state: web::Data<AppState>,
  hb: web::Data<Handlebars<'_>>,
  path: web::Path<(i64,)>,
  user: MaybeUser,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  let id = path.into_inner().0;
  let post = load_post(&app_state, id)?;
  if post.category.requires_login() && user.0.is_none() {
    return Err(Error::LoginRequired(request_path(&req)));
  }
  db::increment_views(&app_state.pool, id).map_err(map_db_error)?;
  render_detail(&app_state, &hb, id, user.0.as_ref(), String::new(), FormErrors::default())
}

pub async fn add_comment(
  app_state: web::Data<AppState>,
  hb: web::Data<Handlebars<'_>>,
  path: web::Path<(i64,)>,
  mut form: web::Form<CommentForm>,
  user: CurrentUser
) -> Result<HttpResponse, Error> {
  let id = path.into_inner().0;
  load_post(&app_state, id)?;
  let errors = form.validate();
  if !errors.is_empty() {
    return render_detail(&app_state, &hb, id, Some(&user.0), form.into_inner().content, errors);
  }
  let mut comment = Comment {
    id: -1,
    post_id: id,
    author: user.0.display_name().to_string(),
    user_id: Some(user.0.id),
    content: form.into_inner().content,
    created_at: time_utils::current_timestamp()
  };
  db::add_comment(&app_state.pool, &mut comment)
    .map_err(|e| {
      error!("Could not insert a comment - {:?}", e);
      Error::DatabaseError(String::from("Failed to insert comment"))
    })?;
  Ok(redirect(&detail_url(id)))
}

// Only the author gets the form, everybody else is sent
// back to the post.
pub async fn edit_post_form(
  app_state: web::Data<AppState>,
  hb: web::Data<Handlebars<'_>>,
  path: web::Path<(i64,)>,
  user: CurrentUser
) -> Result<HttpResponse, Error> {
  let post = load_post(&app_state, path.into_inner().0)?;
  if !post.is_owned_by(&user.0) {
    return Ok(redirect(&detail_url(post.id)));
  }
  let form = PostForm {
    title: post.title.clone(),
    content: post.content.clone(),
    category: post.category.slug().to_string()
  };
  render_post_form(&app_state, &hb, &user.0, Some(&post), &form, FormErrors::default())
}

pub async fn update_post(
  app_state: web::Data<AppState>,
  hb: web::Data<Handlebars<'_>>,
  path: web::Path<(i64,)>,
  payload: Multipart,
  user: CurrentUser
) -> Result<HttpResponse, Error> {
  let mut post = load_post(&app_state, path.into_inner().0)?;
  if !post.is_owned_by(&user.0) {
    return Ok(redirect(&detail_url(post.id)));
  }
  let submission = read_post_submission(payload, app_state.max_upload_size).await?;
  let image_count = submission.image_count();
  let PostSubmission { mut form, uploads, mut errors, .. } = submission;
  let (category, form_errors) = form.validate();
  errors.fields.extend(form_errors.fields);
  let existing = db::post_images(&app_state.pool, post.id)
    .map_err(map_db_error)?
    .len();
  if image_count > remaining_image_slots(existing) {
    errors.non_field(too_many_images_message(existing));
  }
  let category = match category {
    Some(c) if errors.is_empty() => c,
    _ => return render_post_form(&app_state, &hb, &user.0, Some(&post), &form, errors)
  };

  let images = store_uploads(&app_state, &uploads)?;
  post.title = form.title.clone();
  post.content = form.content.clone();
  post.category = category;
  match db::update_post(&app_state.pool, &post, &images) {
    Ok(()) => Ok(redirect(&detail_url(post.id))),
    Err(WriteError::TooManyImages(_, existing)) => {
      // Someone else was faster. The files we just
      // stored may be orphans now.
      cleanup_images(&app_state, &images);
      errors.non_field(too_many_images_message(existing));
      render_post_form(&app_state, &hb, &user.0, Some(&post), &form, errors)
    },
    Err(e) => {
      cleanup_images(&app_state, &images);
      error!("Could not update post {} - {}", post.id, e);
      Err(Error::DatabaseError(String::from("Failed to update post")))
    }
  }
}

pub async fn delete_post(
  app_state: web::Data<AppState>,
  path: web::Path<(i64,)>,
  user: CurrentUser
) -> Result<HttpResponse, Error> {
  let post = load_post(&app_state, path.into_inner().0)?;
  if !post.is_owned_by(&user.0) {
    return Ok(redirect(&detail_url(post.id)));
  }
  if let Some(file_keys) = db::delete_post(&app_state.pool, post.id).map_err(map_db_error)? {
    info!("Post {} deleted by user {}", post.id, user.0.id);
    cleanup_files(&app_state, &file_keys);
  }
  Ok(redirect(&format!("/board/{}/", PostFeed::for_category(post.category).slug)))
}

pub async fn delete_image(
  app_state: web::Data<AppState>,
  path: web::Path<(i64, i64)>,
  user: CurrentUser
) -> Result<HttpResponse, Error> {
  let (post_id, image_id) = path.into_inner();
  let post = load_post(&app_state, post_id)?;
  if !post.is_owned_by(&user.0) {
    return Ok(redirect(&detail_url(post.id)));
  }
  let image = db::delete_post_image(&app_state.pool, post.id, image_id)
    .map_err(map_db_error)?
    .ok_or_else(|| Error::NotFound(String::from("Image does not exist")))?;
  cleanup_files(&app_state, &[image.file_key]);
  Ok(redirect(&format!("/board/{}/edit", post.id)))
}

// The global recommend toggle. No login needed, except
// for secret posts that you can't even see otherwise.
pub async fn recommend_post(
  app_state: web::Data<AppState>,
  path: web::Path<(i64,)>,
  user: MaybeUser,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  let post = load_post(&app_state, path.into_inner().0)?;
  if post.category.requires_login() && user.0.is_none() {
    return Err(Error::LoginRequired(detail_url(post.id)));
  }
  db::toggle_recommended(&app_state.pool, Target::Post(post.id))
    .map_err(map_db_error)?
    .ok_or_else(|| Error::NotFound(String::from("Post does not exist")))?;
  Ok(redirect_back(&req, &detail_url(post.id)))
}

// Per user like, for the scripts.
pub async fn like_post(
  app_state: web::Data<AppState>,
  path: web::Path<(i64,)>,
  user: MaybeUser
) -> Result<HttpResponse, Error> {
  let member = user.0.ok_or(Error::LoginRequiredJson)?;
  let state = db::toggle_like(&app_state.pool, Target::Post(path.into_inner().0), member.id)
    .map_err(map_db_error)?
    .ok_or_else(|| Error::NotFound(String::from("Post does not exist")))?;
  Ok(HttpResponse::Ok().json(state))
}
