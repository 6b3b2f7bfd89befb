use actix_web::{web, HttpResponse, Result};
use handlebars::Handlebars;
use log::{error, info, warn};
use crate::db::{self, WriteError};
use crate::app::dtos::*;
use crate::app::error::{Error, map_db_error};
use crate::app::forms::{
  FormErrors,
  LoginForm,
  PasswordChangeForm,
  PasswordResetForm,
  SignupForm
};
use crate::app::helpers::{redirect, render};
use crate::app::passwords::{
  hash_password_blocking,
  temporary_password,
  verify_password_blocking
};
use crate::app::session::{CurrentUser, MaybeUser};
use crate::app::AppState;

const INVALID_CREDENTIALS: &'static str = "Please enter a correct email and password.";
const NO_SUCH_MEMBER: &'static str = "No account matches this email and nickname.";

fn render_form<F: serde::Serialize>(
  app_state: &AppState,
  hb: &Handlebars<'_>,
  template: &str,
  user: &MaybeUser,
  form: &F,
  errors: FormErrors
) -> Result<HttpResponse, Error> {
  render(
    hb,
    template,
    &PageContext::new(
      &app_state.site_info,
      user.0.as_ref(),
      "",
      FormPage { form, errors }
    )
  )
}

// Response with the session cookie set, going to "location".
fn signed_in(
  app_state: &AppState,
  user_id: i64,
  password_hash: &str,
  location: &str
) -> HttpResponse {
  let mut resp = redirect(location);
  if let Err(e) = resp.add_cookie(&app_state.sessions.login_cookie(user_id, password_hash)) {
    error!("Could not set the session cookie - {}", e);
  }
  resp
}

pub async fn signup_form(
  app_state: web::Data<AppState>,
  hb: web::Data<Handlebars<'_>>,
  user: MaybeUser
) -> Result<HttpResponse, Error> {
  render_form(&app_state, &hb, "signup", &user, &SignupForm::default(), FormErrors::default())
}

pub async fn signup(
  app_state: web::Data<AppState>,
  hb: web::Data<Handlebars<'_>>,
  form: web::Form<SignupForm>,
  user: MaybeUser
) -> Result<HttpResponse, Error> {
  let mut form = form.into_inner();
  let mut errors = form.validate();
  // Friendlier to get both messages at once, the unique
  // indexes still have the last word.
  if !errors.has_field("email")
    && db::email_exists(&app_state.pool, &form.email).map_err(map_db_error)? {
    errors.field("email", WriteError::DuplicateEmail.to_string());
  }
  if !errors.has_field("nickname")
    && db::nickname_exists(&app_state.pool, &form.nickname).map_err(map_db_error)? {
    errors.field("nickname", WriteError::DuplicateNickname.to_string());
  }
  if !errors.is_empty() {
    return render_form(&app_state, &hb, "signup", &user, &form, errors);
  }

  let hash = hash_password_blocking(form.password.clone()).await?;
  match db::create_account(&app_state.pool, &form.email, &hash, &form.nickname) {
    Ok(member) => {
      info!("New account {} ({})", member.id, member.email);
      Ok(signed_in(&app_state, member.id, &hash, "/"))
    },
    Err(WriteError::DuplicateEmail) => {
      errors.field("email", WriteError::DuplicateEmail.to_string());
      render_form(&app_state, &hb, "signup", &user, &form, errors)
    },
    Err(WriteError::DuplicateNickname) => {
      errors.field("nickname", WriteError::DuplicateNickname.to_string());
      render_form(&app_state, &hb, "signup", &user, &form, errors)
    },
    Err(e) => {
      error!("Could not create an account - {}", e);
      Err(Error::DatabaseError(String::from("Failed to create account")))
    }
  }
}

#[derive(serde::Deserialize)]
pub struct NextQuery {
  pub next: Option<String>
}

pub async fn login_form(
  app_state: web::Data<AppState>,
  hb: web::Data<Handlebars<'_>>,
  query: web::Query<NextQuery>,
  user: MaybeUser
) -> Result<HttpResponse, Error> {
  let form = LoginForm {
    next: query.into_inner().next,
    ..LoginForm::default()
  };
  render_form(&app_state, &hb, "login", &user, &form, FormErrors::default())
}

pub async fn login(
  app_state: web::Data<AppState>,
  hb: web::Data<Handlebars<'_>>,
  form: web::Form<LoginForm>,
  user: MaybeUser
) -> Result<HttpResponse, Error> {
  let mut form = form.into_inner();
  let mut errors = form.validate();
  if !errors.is_empty() {
    return render_form(&app_state, &hb, "login", &user, &form, errors);
  }
  // Same message whether the email or the password is
  // wrong.
  let account = match db::account_by_email(&app_state.pool, &form.email).map_err(map_db_error)? {
    Some(a) => {
      let hash = a.password_hash.clone();
      if verify_password_blocking(form.password.clone(), hash).await { Some(a) } else { None }
    },
    None => None
  };
  let member = match &account {
    Some(a) => db::member_by_id(&app_state.pool, a.id).map_err(map_db_error)?,
    None => None
  };
  match (account, member) {
    (Some(a), Some(m)) => {
      info!("User {} signed in", m.id);
      let location = if m.is_temporary_password {
        "/password/change"
      } else {
        form.redirect_target()
      };
      Ok(signed_in(&app_state, m.id, &a.password_hash, location))
    },
    _ => {
      warn!("Failed login attempt for {}", form.email);
      errors.non_field(INVALID_CREDENTIALS);
      render_form(&app_state, &hb, "login", &user, &form, errors)
    }
  }
}

pub async fn logout(app_state: web::Data<AppState>) -> Result<HttpResponse, Error> {
  let mut resp = redirect("/");
  if let Err(e) = resp.add_cookie(&app_state.sessions.logout_cookie()) {
    error!("Could not remove the session cookie - {}", e);
  }
  Ok(resp)
}

pub async fn password_reset_form(
  app_state: web::Data<AppState>,
  hb: web::Data<Handlebars<'_>>,
  user: MaybeUser
) -> Result<HttpResponse, Error> {
  render_form(
    &app_state,
    &hb,
    "password_reset",
    &user,
    &PasswordResetForm::default(),
    FormErrors::default()
  )
}

// No email gets sent, the new password is shown right
// there on the page.
pub async fn password_reset(
  app_state: web::Data<AppState>,
  hb: web::Data<Handlebars<'_>>,
  form: web::Form<PasswordResetForm>,
  user: MaybeUser
) -> Result<HttpResponse, Error> {
  let mut form = form.into_inner();
  let mut errors = form.validate();
  if !errors.is_empty() {
    return render_form(&app_state, &hb, "password_reset", &user, &form, errors);
  }
  let member = db::member_by_email_and_nickname(&app_state.pool, &form.email, &form.nickname)
    .map_err(map_db_error)?;
  let member = match member {
    Some(m) => m,
    None => {
      errors.non_field(NO_SUCH_MEMBER);
      return render_form(&app_state, &hb, "password_reset", &user, &form, errors);
    }
  };

  let password = temporary_password();
  let hash = hash_password_blocking(password.clone()).await?;
  db::set_password(&app_state.pool, member.id, &hash, true).map_err(map_db_error)?;
  info!("Temporary password issued for user {}", member.id);
  render(
    &hb,
    "password_reset_done",
    &PageContext::new(
      &app_state.site_info,
      user.0.as_ref(),
      "",
      PasswordResetDone {
        email: member.email,
        temporary_password: password
      }
    )
  )
}

fn render_password_change(
  app_state: &AppState,
  hb: &Handlebars<'_>,
  user: &CurrentUser,
  errors: FormErrors
) -> Result<HttpResponse, Error> {
  render(
    hb,
    "password_change",
    &PageContext::new(
      &app_state.site_info,
      Some(&user.0),
      "",
      PasswordChangePage {
        errors,
        forced: user.0.is_temporary_password
      }
    )
  )
}

pub async fn password_change_form(
  app_state: web::Data<AppState>,
  hb: web::Data<Handlebars<'_>>,
  user: CurrentUser
) -> Result<HttpResponse, Error> {
  render_password_change(&app_state, &hb, &user, FormErrors::default())
}

pub async fn password_change(
  app_state: web::Data<AppState>,
  hb: web::Data<Handlebars<'_>>,
  form: web::Form<PasswordChangeForm>,
  user: CurrentUser
) -> Result<HttpResponse, Error> {
  let errors = form.validate();
  if !errors.is_empty() {
    return render_password_change(&app_state, &hb, &user, errors);
  }
  let hash = hash_password_blocking(form.new_password.clone()).await?;
  db::set_password(&app_state.pool, user.0.id, &hash, false).map_err(map_db_error)?;
  info!("User {} changed their password", user.0.id);
  // Every other session is gone with the old hash, this
  // one carries on with a fresh cookie.
  Ok(signed_in(&app_state, user.0.id, &hash, "/"))
}

pub async fn profile(
  app_state: web::Data<AppState>,
  hb: web::Data<Handlebars<'_>>,
  user: CurrentUser
) -> Result<HttpResponse, Error> {
  let pool = &app_state.pool;
  let member = &user.0;
  let page = ProfilePage {
    nickname: member.nickname.clone(),
    email: member.email.clone(),
    points: member.points,
    post_count: db::post_count_by_user(pool, member.id).map_err(map_db_error)?,
    comment_count: db::comment_count_by_user(pool, member.id).map_err(map_db_error)?,
    link_count: db::link_count_by_user(pool, member.id).map_err(map_db_error)?
  };
  render(
    &hb,
    "profile",
    &PageContext::new(&app_state.site_info, Some(member), "", page)
  )
}
