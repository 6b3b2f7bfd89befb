mod app;
mod board;
mod config;
mod db;
mod utils;

use color_eyre::Result;
use dotenv::dotenv;

#[actix_web::main]
async fn main() -> Result<()> {
  dotenv().ok();
  // Log requests and everything else at info level unless
  // RUST_LOG says otherwise.
  env_logger::Builder::from_env(
    env_logger::Env::default().default_filter_or("info")
  ).init();
  color_eyre::install()?;

  app::run().await
}
