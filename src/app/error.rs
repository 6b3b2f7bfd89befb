use actix_web::{
  error::ResponseError,
  http::header,
  HttpResponse
};
use color_eyre::Report;
use derive_more::Display;
use log::error;
use serde_json::json;

// I could use
// #[display(fmt = "Internal server error: {}", _0)]
// To display the full message, but I don't want it
// to show up to random internet people, the full
// error output should only appear in logs.
#[derive(Debug, Display)]
pub enum Error {
  #[display(fmt = "Internal Server Error")]
  InternalServerError(String),
  #[display(fmt = "Database Error")]
  DatabaseError(String),
  #[display(fmt = "Not Found: {}", _0)]
  NotFound(String),
  #[display(fmt = "Bad Request (check request params)")]
  BadRequest(String),
  // HTML pages send you to the login form, with the
  // path to come back to.
  #[display(fmt = "Login required")]
  LoginRequired(String),
  // Same thing for the JSON endpoints
  #[display(fmt = "Login required")]
  LoginRequiredJson
}

// Plain text for error responses, except the JSON
// endpoints that need to know they have to log in.
impl ResponseError for Error {
  fn error_response(&self) -> HttpResponse {
    match self {
      Error::InternalServerError(_) | Error::DatabaseError(_) =>
        HttpResponse::InternalServerError().body(self.to_string()),
      Error::NotFound(_) => HttpResponse::NotFound().body(self.to_string()),
      Error::BadRequest(_) => HttpResponse::BadRequest().body(self.to_string()),
      Error::LoginRequired(next) => HttpResponse::SeeOther()
        .insert_header((header::LOCATION, login_url(next)))
        .finish(),
      Error::LoginRequiredJson => HttpResponse::Forbidden()
        .json(json!({ "error": self.to_string() }))
    }
  }
}

pub fn login_url(next: &str) -> String {
  if next.is_empty() || next == "/" {
    return String::from("/login");
  }
  let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
  format!("/login?next={}", encoded)
}

// The actual error only goes to the logs.
pub fn map_db_error(e: Report) -> Error {
  error!("Database error: {:?}", e);
  Error::DatabaseError(e.to_string())
}

pub fn map_template_error(e: handlebars::RenderError) -> Error {
  error!("A template engine error occured: {}", e);
  Error::InternalServerError(String::from("Template engine error"))
}

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::http::StatusCode;

  #[test]
  fn login_url_encodes_next() {
    assert_eq!(login_url("/board/12"), "/login?next=%2Fboard%2F12");
    assert_eq!(login_url("/"), "/login");
  }

  #[test]
  fn login_required_redirects() {
    let sut = Error::LoginRequired(String::from("/profile")).error_response();
    assert_eq!(sut.status(), StatusCode::SEE_OTHER);
    assert_eq!(
      sut.headers().get(header::LOCATION).unwrap(),
      "/login?next=%2Fprofile"
    );
  }

  #[test]
  fn details_are_not_leaked() {
    let sut = Error::DatabaseError(String::from("secret table name"));
    assert_eq!(sut.to_string(), "Database Error");
    assert_eq!(sut.error_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
  }

  #[test]
  fn json_login_required_is_forbidden() {
    let sut = Error::LoginRequiredJson.error_response();
    assert_eq!(sut.status(), StatusCode::FORBIDDEN);
  }
}
