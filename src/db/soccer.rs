use rusqlite::params;
use eyre::WrapErr;
use color_eyre::Result;
use super::{Pool, select_many};
use super::entities::SoccerMatch;
use super::mappers::{MATCH_COLUMNS, map_soccer_match};
use super::queries::{Order, OrderBy, Query};

// Matches are identified by teams and kickoff, importing
// the same match again updates the score and status.
// Returns how many matches were written.
pub fn upsert_matches(pool: &Pool, matches: &[SoccerMatch]) -> Result<usize> {
  let mut conn = pool.get()?;
  let tx = conn.transaction()?;
  let mut written = 0;
  {
    let mut stmt = tx.prepare(
      "INSERT INTO soccer_matches
      (competition, home_team, away_team, kickoff, venue, home_score, away_score, status)
      VALUES (?, ?, ?, ?, ?, ?, ?, ?)
      ON CONFLICT (home_team, away_team, kickoff) DO UPDATE SET
        competition = excluded.competition,
        venue = excluded.venue,
        home_score = excluded.home_score,
        away_score = excluded.away_score,
        status = excluded.status"
    )?;
    for m in matches {
      written += stmt.execute(params![
        m.competition,
        m.home_team,
        m.away_team,
        m.kickoff,
        m.venue,
        m.home_score,
        m.away_score,
        m.status
      ]).context(format!("Upserting match {} - {}", m.home_team, m.away_team))?;
    }
  }
  tx.commit().context("Committing soccer matches")?;
  Ok(written)
}

pub fn all_matches(pool: &Pool) -> Result<Vec<SoccerMatch>> {
  select_many(
    pool,
    &Query::select(&[MATCH_COLUMNS], "soccer_matches m")
      .order(OrderBy::new(Order::Desc, "m.kickoff"))
      .to_string(),
    [],
    map_soccer_match
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::test_pool;

  fn sample(kickoff: i64, status: &str) -> SoccerMatch {
    serde_json::from_value(serde_json::json!({
      "competition": "K League 1",
      "home_team": "Seoul",
      "away_team": "Ulsan",
      "kickoff": kickoff,
      "status": status
    })).unwrap()
  }

  #[test]
  fn import_is_idempotent_on_teams_and_kickoff() {
    let pool = test_pool();
    upsert_matches(&pool, &[sample(1000, "scheduled"), sample(2000, "scheduled")]).unwrap();
    let mut finished = sample(1000, "finished");
    finished.home_score = Some(2);
    finished.away_score = Some(1);
    upsert_matches(&pool, &[finished]).unwrap();
    let sut = all_matches(&pool).unwrap();
    assert_eq!(sut.len(), 2);
    // Latest kickoff first
    assert_eq!(sut[0].kickoff, 2000);
    assert_eq!(sut[1].status, "finished");
    assert_eq!(sut[1].home_score, Some(2));
  }

  #[test]
  fn deserialized_match_defaults() {
    let sut = sample(1000, "scheduled");
    assert_eq!(sut.id, -1);
    assert!(sut.venue.is_none());
  }
}
