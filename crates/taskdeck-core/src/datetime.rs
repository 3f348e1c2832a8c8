use anyhow::anyhow;
use chrono::{
  DateTime,
  NaiveDate,
  NaiveDateTime,
  SecondsFormat,
  Utc
};

const NAIVE_DATETIME_FORMATS: [&str; 3] = [
  "%Y-%m-%dT%H:%M:%S%.f",
  "%Y-%m-%dT%H:%M",
  "%Y-%m-%d %H:%M:%S"
];

/// Accepts RFC 3339 timestamps, bare
/// `YYYY-MM-DD` dates and the naive
/// `datetime-local` shapes date pickers
/// emit. Naive values are taken as UTC.
pub fn parse_date(
  raw: &str
) -> Option<DateTime<Utc>> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return None;
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(trimmed)
  {
    return Some(dt.with_timezone(&Utc));
  }

  if let Ok(date) = NaiveDate::parse_from_str(
    trimmed, "%Y-%m-%d"
  ) {
    return date
      .and_hms_opt(0, 0, 0)
      .map(|naive| naive.and_utc());
  }

  NAIVE_DATETIME_FORMATS
    .iter()
    .find_map(|fmt| {
      NaiveDateTime::parse_from_str(
        trimmed, fmt
      )
      .ok()
    })
    .map(|naive| naive.and_utc())
}

/// Canonical wire form for every date the
/// client sends.
#[must_use]
pub fn format_wire(
  dt: DateTime<Utc>
) -> String {
  dt.to_rfc3339_opts(
    SecondsFormat::Millis,
    true
  )
}

pub fn normalize_date(
  raw: &str
) -> anyhow::Result<String> {
  parse_date(raw)
    .map(format_wire)
    .ok_or_else(|| {
      anyhow!("invalid date: {raw:?}")
    })
}

pub fn calendar_date(
  raw: &str
) -> Option<NaiveDate> {
  parse_date(raw).map(|dt| dt.date_naive())
}

/// Positive when `to` lies after `from`.
#[must_use]
pub fn days_between(
  from: NaiveDate,
  to: NaiveDate
) -> i64 {
  to.signed_duration_since(from)
    .num_days()
}

#[must_use]
pub fn display_date(raw: &str) -> String {
  calendar_date(raw)
    .map(|d| d.format("%Y-%m-%d").to_string())
    .unwrap_or_else(|| raw.trim().to_string())
}
