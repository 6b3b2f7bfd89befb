use actix_web::{
  cookie::{time::Duration, Cookie, SameSite},
  dev::Payload,
  web,
  FromRequest,
  HttpRequest
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use futures::future::{ready, Ready};
use hmac::{Hmac, Mac};
use log::warn;
use sha2::Sha256;
use crate::db::{self, entities::Member};
use crate::utils::time_utils::current_timestamp;
use super::error::{Error, map_db_error};
use super::AppState;

type HmacSha256 = Hmac<Sha256>;

// Sessions last a month, there's no server side
// session storage at all.
pub const SESSION_MAX_AGE_DAYS: i64 = 30;
const SESSION_MAX_AGE_SECONDS: i64 = SESSION_MAX_AGE_DAYS * 24 * 3600;

// The session cookie holds "user_id.issued_at.signature",
// the signature being the HMAC of the first two parts and
// the user's current password hash with the session secret.
// Changing the password kills every session signed before.
pub struct SessionSigner {
  secret: Vec<u8>,
  cookie_name: String
}

impl SessionSigner {

  pub fn new(secret: &str, cookie_name: &str) -> Self {
    Self {
      secret: secret.as_bytes().to_vec(),
      cookie_name: cookie_name.to_string()
    }
  }

  fn mac(&self, payload: &str, password_hash: &str) -> Option<HmacSha256> {
    // HMAC takes keys of any size, this can't really fail.
    let mut mac = HmacSha256::new_from_slice(&self.secret).ok()?;
    mac.update(payload.as_bytes());
    mac.update(b".");
    mac.update(password_hash.as_bytes());
    Some(mac)
  }

  pub fn sign(&self, user_id: i64, issued_at: i64, password_hash: &str) -> String {
    let payload = format!("{}.{}", user_id, issued_at);
    let signature = self.mac(&payload, password_hash)
      .map(|m| URL_SAFE_NO_PAD.encode(m.finalize().into_bytes()))
      .unwrap_or_default();
    format!("{}.{}", payload, signature)
  }

  // User id the token claims to be for, not verified yet.
  pub fn claimed_user_id(token: &str) -> Option<i64> {
    token.split('.').next()?.parse().ok()
  }

  // Gives the user id if the token is ours, was signed
  // with that password hash and hasn't expired.
  pub fn verify(&self, token: &str, password_hash: &str, now: i64) -> Option<i64> {
    let (payload, signature) = token.rsplit_once('.')?;
    let (user_id, issued_at) = payload.split_once('.')?;
    let user_id: i64 = user_id.parse().ok()?;
    let issued_at: i64 = issued_at.parse().ok()?;
    let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;
    // verify_slice is constant time.
    self.mac(payload, password_hash)?.verify_slice(&signature).ok()?;
    if now - issued_at > SESSION_MAX_AGE_SECONDS || issued_at > now + 60 {
      return None;
    }
    Some(user_id)
  }

  pub fn login_cookie(&self, user_id: i64, password_hash: &str) -> Cookie<'static> {
    Cookie::build(
      self.cookie_name.clone(),
      self.sign(user_id, current_timestamp(), password_hash)
    )
      .path("/")
      .http_only(true)
      .same_site(SameSite::Lax)
      .max_age(Duration::days(SESSION_MAX_AGE_DAYS))
      .finish()
  }

  pub fn logout_cookie(&self) -> Cookie<'static> {
    let mut cookie = Cookie::build(self.cookie_name.clone(), "")
      .path("/")
      .finish();
    cookie.make_removal();
    cookie
  }

  pub fn token(&self, req: &HttpRequest) -> Option<String> {
    req.cookie(&self.cookie_name)
      .map(|c| c.value().to_string())
      .filter(|v| !v.is_empty())
  }
}

fn load_member(req: &HttpRequest) -> Result<Option<Member>, Error> {
  let app_state = match req.app_data::<web::Data<AppState>>() {
    Some(s) => s,
    None => return Err(Error::InternalServerError(
      String::from("Application state missing")
    ))
  };
  let token = match app_state.sessions.token(req) {
    Some(t) => t,
    None => return Ok(None)
  };
  // A deleted user with a still valid cookie is just
  // anonymous.
  let account = match SessionSigner::claimed_user_id(&token) {
    Some(id) => db::account_by_id(&app_state.pool, id).map_err(map_db_error)?,
    None => None
  };
  let user_id = account.and_then(|a|
    app_state.sessions.verify(&token, &a.password_hash, current_timestamp())
  );
  match user_id {
    Some(id) => db::member_by_id(&app_state.pool, id).map_err(map_db_error),
    None => {
      warn!("Invalid or expired session cookie from {:?}", req.peer_addr());
      Ok(None)
    }
  }
}

// Path (and query) of the request, where the login form
// sends you back.
pub fn request_path(req: &HttpRequest) -> String {
  match req.uri().path_and_query() {
    Some(pq) => pq.as_str().to_string(),
    None => String::from("/")
  }
}

// Extractor for pages that work with or without a user.
pub struct MaybeUser(pub Option<Member>);

impl MaybeUser {
  pub fn id(&self) -> Option<i64> {
    self.0.as_ref().map(|m| m.id)
  }
}

impl FromRequest for MaybeUser {
  type Error = Error;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
    ready(load_member(req).map(MaybeUser))
  }
}

// Extractor for pages that need a user, sends everybody
// else to the login form.
pub struct CurrentUser(pub Member);

impl FromRequest for CurrentUser {
  type Error = Error;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
    ready(match load_member(req) {
      Ok(Some(member)) => Ok(CurrentUser(member)),
      Ok(None) => Err(Error::LoginRequired(request_path(req))),
      Err(e) => Err(e)
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn signed_token_verifies() {
    let sut = SessionSigner::new("secret", "session");
    let token = sut.sign(42, 1000, "hash");
    assert!(token.starts_with("42.1000."));
    assert_eq!(SessionSigner::claimed_user_id(&token), Some(42));
    assert_eq!(sut.verify(&token, "hash", 1000), Some(42));
  }

  #[test]
  fn tampered_token_is_rejected() {
    let sut = SessionSigner::new("secret", "session");
    let token = sut.sign(42, 1000, "hash");
    let forged = token.replacen("42", "43", 1);
    assert_eq!(sut.verify(&forged, "hash", 1000), None);
    let other = SessionSigner::new("other secret", "session");
    assert_eq!(other.verify(&token, "hash", 1000), None);
    assert_eq!(sut.verify("garbage", "hash", 1000), None);
    assert_eq!(sut.verify("1.2.!!!", "hash", 1000), None);
    assert_eq!(SessionSigner::claimed_user_id("garbage"), None);
  }

  #[test]
  fn new_password_hash_invalidates_token() {
    let sut = SessionSigner::new("secret", "session");
    let token = sut.sign(42, 1000, "old hash");
    assert_eq!(sut.verify(&token, "new hash", 1000), None);
  }

  #[test]
  fn expired_token_is_rejected() {
    let sut = SessionSigner::new("secret", "session");
    let token = sut.sign(42, 1000, "hash");
    assert_eq!(sut.verify(&token, "hash", 1000 + SESSION_MAX_AGE_SECONDS + 1), None);
  }

  #[test]
  fn logout_cookie_removes() {
    let sut = SessionSigner::new("secret", "session");
    let cookie = sut.logout_cookie();
    assert_eq!(cookie.name(), "session");
    assert_eq!(cookie.value(), "");
    assert_eq!(cookie.max_age(), Some(Duration::ZERO));
  }
}
