// Adding the context method to errors:
use eyre::WrapErr;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::convert::From;

// Anyone knowing the secret can sign in as anyone, so
// there's no default and short ones are refused.
pub const MIN_SESSION_SECRET_LENGTH: usize = 32;

#[derive(Deserialize)]
pub struct Config {
  pub db_path: String,
  pub bind_address: String,
  pub template_dir: String,
  // Where uploaded images are written, and the URL
  // path they are served from:
  pub upload_dir: String,
  pub upload_url: String,
  // Key used to sign the session cookie
  pub session_secret: String,
  pub session_cookie: String,
  // In bytes, for a single uploaded image
  pub max_upload_size: usize,
  pub site_title: String
}

// Looks redundant but I thought having another
// struct would be better than moving all of this
// info around the app_state, especially since
// there is sensible info in the config (the
// session secret).
#[derive(Debug, Clone, Serialize)]
pub struct SiteInfo {
  pub title: String,
  pub upload_url: String
}

impl From<&Config> for SiteInfo {
  fn from(config: &Config) -> Self {
    Self {
      title: config.site_title.clone(),
      upload_url: config.upload_url.clone()
    }
  }
}

// Same as a derived Debug minus the session secret, the
// config gets logged at startup.
impl std::fmt::Debug for Config {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Config")
      .field("db_path", &self.db_path)
      .field("bind_address", &self.bind_address)
      .field("template_dir", &self.template_dir)
      .field("upload_dir", &self.upload_dir)
      .field("upload_url", &self.upload_url)
      .field("session_cookie", &self.session_cookie)
      .field("max_upload_size", &self.max_upload_size)
      .field("site_title", &self.site_title)
      .finish()
  }
}

impl Config {

  pub fn from_env() -> Result<Config> {
    // You have to use lowercase when compared to
    // what's in the .env file.
    let c = config::Config::builder()
      .set_default("db_path", "./board.sqlite")?
      .set_default("bind_address", "127.0.0.1:8080")?
      .set_default("template_dir", "./templates")?
      .set_default("upload_dir", "./uploads")?
      // Should never have a trailing slash or THINGS WILL BREAK.
      .set_default("upload_url", "/uploads")?
      .set_default("session_cookie", "board_session")?
      // 5MB
      .set_default("max_upload_size", 5_i64 * 1024 * 1024)?
      .set_default("site_title", "Community board")?
      .add_source(config::Environment::default())
      .build()?;
    // The error has to be given a context for
    // color_eyre to work here:
    let config: Config = c.try_deserialize()
      .context("Loading configuration from env, SESSION_SECRET is required")?;
    config.check()?;
    Ok(config)
  }

  pub fn check(&self) -> Result<()> {
    if self.session_secret.trim().len() < MIN_SESSION_SECRET_LENGTH {
      eyre::bail!(
        "SESSION_SECRET has to be at least {} characters long",
        MIN_SESSION_SECRET_LENGTH
      );
    }
    Ok(())
  }

}
