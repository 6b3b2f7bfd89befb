use chrono::{Local, TimeZone, Utc};

// chrono formatting reference:
// https://docs.rs/chrono/latest/chrono/format/strftime/index.html
const DATE_FORMAT_STANDARD: &'static str = "%Y-%m-%d %H:%M";
const DATE_FORMAT_COMPACT: &'static str = "%m-%d";

pub enum DateFormat {
  Standard,
  Compact
}

impl DateFormat {
  fn pattern(&self) -> &'static str {
    match self {
      DateFormat::Standard => DATE_FORMAT_STANDARD,
      DateFormat::Compact => DATE_FORMAT_COMPACT
    }
  }
}

pub fn timestamp_to_date_string(timestamp: i64, format: DateFormat) -> String {
  format_in_zone(&Local, timestamp, format)
}

// Tests can't rely on whatever timezone the machine is in,
// so the actual formatting takes the zone as a parameter.
pub fn format_in_zone<Tz>(tz: &Tz, timestamp: i64, format: DateFormat) -> String 
where
  Tz: TimeZone,
  Tz::Offset: std::fmt::Display
{
  match tz.timestamp_opt(timestamp, 0).single() {
    Some(d) => d.format(format.pattern()).to_string(),
    None => String::new()
  }
}

pub fn current_timestamp() -> i64 {
  Utc::now().timestamp()
}
