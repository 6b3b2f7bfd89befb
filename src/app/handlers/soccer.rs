use actix_web::{web, HttpResponse, Result};
use handlebars::Handlebars;
use log::info;
use serde_json::json;
use crate::db::{self, entities::SoccerMatch};
use crate::app::dtos::*;
use crate::app::error::{Error, map_db_error};
use crate::app::helpers::render;
use crate::app::session::MaybeUser;
use crate::app::AppState;

pub async fn match_list(
  app_state: web::Data<AppState>,
  hb: web::Data<Handlebars<'_>>,
  user: MaybeUser
) -> Result<HttpResponse, Error> {
  let matches = db::all_matches(&app_state.pool)
    .map_err(map_db_error)?
    .into_iter()
    .map(MatchDto::from)
    .collect();
  render(
    &hb,
    "soccer",
    &PageContext::new(&app_state.site_info, user.0.as_ref(), "", SoccerPage { matches })
  )
}

// Called by the fixtures script from the server itself,
// the route is guarded on the client IP.
pub async fn import_matches(
  app_state: web::Data<AppState>,
  matches: web::Json<Vec<SoccerMatch>>
) -> Result<HttpResponse, Error> {
  let imported = db::upsert_matches(&app_state.pool, &matches)
    .map_err(map_db_error)?;
  info!("Imported {} soccer matches", imported);
  Ok(HttpResponse::Ok().json(json!({
    "status": "ok",
    "imported": imported
  })))
}

#[cfg(test)]
mod tests {
  use actix_web::{http::StatusCode, test};
  use serde_json::json;
  use crate::app::test_support::*;
  use crate::db;

  fn matches() -> serde_json::Value {
    json!([
      {
        "competition": "K League 1",
        "home_team": "Ulsan",
        "away_team": "Jeonbuk",
        "kickoff": 1700000000,
        "home_score": 2,
        "away_score": 1,
        "status": "finished"
      },
      {
        "competition": "K League 1",
        "home_team": "Seoul",
        "away_team": "Pohang",
        "kickoff": 1700600000
      }
    ])
  }

  #[actix_web::test]
  async fn import_from_loopback() {
    let state = test_state("soccer-import");
    let app = test::init_service(test_app(state.clone())).await;
    let req = test::TestRequest::post()
      .uri("/soccer/import")
      .peer_addr("127.0.0.1:4000".parse().unwrap())
      .set_json(matches())
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["imported"], 2);
    let sut = db::all_matches(&state.pool).unwrap();
    assert_eq!(sut.len(), 2);
    assert_eq!(sut[0].home_team, "Seoul");

    let req = test::TestRequest::get().uri("/soccer").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = String::from_utf8_lossy(&test::read_body(resp).await).to_string();
    assert!(body.contains("2 - 1"));
  }

  #[actix_web::test]
  async fn import_from_elsewhere_is_404() {
    let state = test_state("soccer-guard");
    let app = test::init_service(test_app(state.clone())).await;
    let req = test::TestRequest::post()
      .uri("/soccer/import")
      .peer_addr("203.0.113.9:4000".parse().unwrap())
      .set_json(matches())
      .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    assert!(db::all_matches(&state.pool).unwrap().is_empty());
  }
}
