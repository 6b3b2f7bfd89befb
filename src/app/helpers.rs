use actix_web::{
  http::header,
  HttpRequest,
  HttpResponse
};
use handlebars::Handlebars;
use serde::Serialize;
use super::dtos::PageContext;
use super::error::{Error, map_template_error};

// Extracting Actix header values is kinda convoluted.
// They check for an error in the header value not
// being convertable to string because of uh...
// invalid characters or something.
pub fn header_value<'a>(req: &'a HttpRequest, name: header::HeaderName) -> Option<&'a str> {
  req.headers().get(name)
    .and_then(|h| h.to_str().ok())
    .filter(|v| !v.is_empty())
}

// Classic "303 See Other" after a form post so that
// reloading the page doesn't post again.
pub fn redirect(location: &str) -> HttpResponse {
  HttpResponse::SeeOther()
    .insert_header((header::LOCATION, location))
    .finish()
}

// Back to where the click came from, or the fallback
// when there's no Referer.
pub fn redirect_back(req: &HttpRequest, fallback: &str) -> HttpResponse {
  redirect(header_value(req, header::REFERER).unwrap_or(fallback))
}

pub fn render<T: Serialize>(
  hb: &Handlebars<'_>,
  template: &str,
  context: &PageContext<'_, T>
) -> Result<HttpResponse, Error> {
  let body = hb.render(template, context)
    .map_err(map_template_error)?;
  Ok(
    HttpResponse::Ok()
      .content_type("text/html; charset=utf-8")
      .body(body)
  )
}
