use actix_web::{middleware, web, App, HttpServer};
use actix_files::Files;
use color_eyre::Result;
use eyre::WrapErr;
use log::{debug, info};
use handlebars::Handlebars;
// I think we have to add crate here because
// of the other crate named "config" that we
// use as a dependency.
use crate::config::{Config, SiteInfo};
use crate::db::{self, Pool};
use media::MediaStore;
use session::SessionSigner;
mod handlers;
mod dtos;
mod error;
mod forms;
mod guards;
mod helpers;
mod media;
mod passwords;
mod session;

// IP addresses allowed to make special calls (like the
// soccer match import).
pub const ALLOWED_IP_ADDRESSES: [&'static str; 2] =
  ["127.0.0.1", "::1"];

// Declare app state struct:
pub struct AppState {
  pub pool: Pool,
  pub media: MediaStore,
  pub sessions: SessionSigner,
  pub site_info: SiteInfo,
  // Max size of one uploaded image, in bytes
  pub max_upload_size: usize
}

fn load_templates(template_dir: &str) -> Result<Handlebars<'static>> {
  let mut handlebars = Handlebars::new();
  handlebars
    .register_templates_directory(".hbs", template_dir)
    .context(format!(
      "Templates directory {} might be missing or not accessible",
      template_dir
    ))?;
  Ok(handlebars)
}

// Function to start the server.
// Has to be async because there's a .await at the end,
// it's called from the #[actix_web::main] thingy in
// main.rs.
pub async fn run() -> Result<()> {
  let config = Config::from_env()
    .context("Configuration (environment or .env file) is missing")?;
  debug!("Current config: {:?}", config);

  let pool = db::open_pool(&config.db_path)?;
  // Crash immediately if the upload directory
  // can't be created:
  let media = MediaStore::open(&config.upload_dir, &config.upload_url)?;

  // Declare the template system, currently using
  // handlebars:
  let handlebars_ref = web::Data::new(load_templates(&config.template_dir)?);

  // Got to save a few things for later because the
  // config is not moved into app_state, only the
  // non-sensitive SiteInfo is.
  let bind_address = config.bind_address.clone();
  let upload_dir = config.upload_dir.clone();
  let upload_url = config.upload_url.clone();

  let app_state = web::Data::new(
    AppState {
      pool,
      media,
      sessions: SessionSigner::new(&config.session_secret, &config.session_cookie),
      site_info: SiteInfo::from(&config),
      max_upload_size: config.max_upload_size
    }
  );

  info!("Starting server on {}", bind_address);
  HttpServer::new(move|| {
    App::new()
      .app_data(app_state.clone())
      .app_data(handlebars_ref.clone())
      .configure(request_config)
      .wrap(middleware::Logger::default())
      .configure(base_endpoints_config)
      .service(Files::new(&upload_url, &upload_dir))
      .default_service(web::route().to(handlers::not_found))
  })
  .bind(bind_address)?
  .run()
  .await
  .context("Start Actix web server")
}

// Extractor configurations. Bad input gives a plain
// 400 instead of the default error bodies.
fn request_config(cfg: &mut web::ServiceConfig) {
  cfg.app_data(web::PathConfig::default().error_handler(|_, _| {
      // No idea how this works but it does:
      actix_web::error::ErrorBadRequest("Invalid path arguments")
    }))
    .app_data(web::QueryConfig::default().error_handler(|_, _| {
      actix_web::error::ErrorBadRequest("Invalid query string arguments")
    }))
    .app_data(web::FormConfig::default().error_handler(|_, _| {
      actix_web::error::ErrorBadRequest("Invalid form data")
    }))
    .app_data(web::JsonConfig::default().error_handler(|_, _| {
      actix_web::error::ErrorBadRequest("Invalid JSON body")
    }));
}

// Route configuration. The literal routes have to come
// before the ones with an {id} in the same position.
fn base_endpoints_config(cfg: &mut web::ServiceConfig) {
  // Create the guard that cause protected endpoints to respond with a 404
  // when the client IP address isn't allowed.
  let ip_guard = guards::IPRestrictedGuard::new(&ALLOWED_IP_ADDRESSES);

  cfg.route("/", web::get().to(handlers::index))
    // Posts
    .route("/board/new", web::get().to(handlers::posts::new_post_form))
    .route("/board/new", web::post().to(handlers::posts::create_post))
    .route("/board/{feed}/", web::get().to(handlers::posts::post_list))
    .route("/board/{id}", web::get().to(handlers::posts::post_detail))
    .route("/board/{id}", web::post().to(handlers::posts::add_comment))
    .route("/board/{id}/edit", web::get().to(handlers::posts::edit_post_form))
    .route("/board/{id}/edit", web::post().to(handlers::posts::update_post))
    .route("/board/{id}/delete", web::post().to(handlers::posts::delete_post))
    .route(
      "/board/{id}/images/{image_id}/delete",
      web::post().to(handlers::posts::delete_image)
    )
    .route("/board/{id}/like", web::post().to(handlers::posts::recommend_post))
    .route("/api/board/{id}/like", web::post().to(handlers::posts::like_post))
    // Links
    .route("/links/{feed}/", web::get().to(handlers::links::link_list))
    .route("/links/{feed}/new", web::get().to(handlers::links::new_link_form))
    .route("/links/{feed}/new", web::post().to(handlers::links::create_link))
    .route("/links/{id}/edit", web::get().to(handlers::links::edit_link_form))
    .route("/links/{id}/edit", web::post().to(handlers::links::update_link))
    .route("/links/{id}/delete", web::post().to(handlers::links::delete_link))
    .route("/links/{id}/recommend", web::post().to(handlers::links::recommend_link))
    .route("/api/links/{id}/like", web::post().to(handlers::links::like_link))
    // Accounts
    .route("/signup", web::get().to(handlers::accounts::signup_form))
    .route("/signup", web::post().to(handlers::accounts::signup))
    .route("/login", web::get().to(handlers::accounts::login_form))
    .route("/login", web::post().to(handlers::accounts::login))
    .route("/logout", web::post().to(handlers::accounts::logout))
    .route("/password/reset", web::get().to(handlers::accounts::password_reset_form))
    .route("/password/reset", web::post().to(handlers::accounts::password_reset))
    .route("/password/change", web::get().to(handlers::accounts::password_change_form))
    .route("/password/change", web::post().to(handlers::accounts::password_change))
    .route("/profile", web::get().to(handlers::accounts::profile))
    // Soccer
    .route("/soccer", web::get().to(handlers::soccer::match_list))
    .route(
      "/soccer/import",
      web::post().guard(ip_guard).to(handlers::soccer::import_matches)
    );
}
