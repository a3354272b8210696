use anyhow::anyhow;
use chrono::{
  DateTime,
  Datelike,
  Duration,
  Local,
  NaiveDate,
  Utc,
  Weekday
};
use chrono_tz::Tz;

pub const TIMEZONE_ENV_VAR: &str =
  "STUDYDESK_TIMEZONE";

/// Resolves the timezone used to decide
/// which calendar day "today" is.
///
/// The environment variable wins over
/// the configured value. `None` means
/// the system local zone.
pub fn resolve_timezone(
  configured: Option<&str>
) -> Option<Tz> {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) = parse_timezone(
      &raw,
      TIMEZONE_ENV_VAR
    )
  {
    return Some(tz);
  }

  configured.and_then(|raw| {
    parse_timezone(raw, "config")
  })
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::debug!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %trimmed,
        "resolved timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::warn!(
        source,
        timezone = %trimmed,
        error = %err,
        "invalid timezone; falling back to local time"
      );
      None
    }
  }
}

#[must_use]
pub fn local_date(
  now: DateTime<Utc>,
  tz: Option<&Tz>
) -> NaiveDate {
  match tz {
    | Some(tz) => {
      now.with_timezone(tz).date_naive()
    }
    | None => {
      now
        .with_timezone(&Local)
        .date_naive()
    }
  }
}

/// Whole days from `today` to `due`;
/// negative when overdue.
#[must_use]
pub fn days_until(
  due: Option<NaiveDate>,
  today: NaiveDate
) -> Option<i64> {
  due.map(|target| {
    target
      .signed_duration_since(today)
      .num_days()
  })
}

#[must_use]
pub fn due_label(
  due: Option<NaiveDate>,
  today: NaiveDate
) -> String {
  let Some(days) = days_until(due, today)
  else {
    return "No due date".to_string();
  };

  match days {
    | d if d < 0 => {
      let overdue = d.unsigned_abs();
      let plural =
        if overdue == 1 { "" } else { "s" };
      format!(
        "Overdue by {overdue} day{plural}"
      )
    }
    | 0 => "Due today".to_string(),
    | 1 => "Due tomorrow".to_string(),
    | d => format!("Due in {d} days")
  }
}

/// Parses a due-date expression
/// relative to `today`.
///
/// Accepted forms: `YYYY-MM-DD`,
/// `today`, `tomorrow`, `yesterday`,
/// signed day offsets (`+3`, `-1`,
/// `3d`, `+2w`) and weekday names,
/// which mean the next such day after
/// `today`.
#[tracing::instrument]
pub fn parse_date_expr(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let raw = input.trim();
  let lower = raw.to_ascii_lowercase();

  if lower.is_empty() {
    return Err(anyhow!(
      "date expression cannot be empty"
    ));
  }

  match lower.as_str() {
    | "today" | "now" => {
      return Ok(today);
    }
    | "tomorrow" => {
      return shift_days(today, 1, raw);
    }
    | "yesterday" => {
      return shift_days(today, -1, raw);
    }
    | _ => {}
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      &lower, "%Y-%m-%d"
    )
  {
    return Ok(date);
  }

  if let Some(days) =
    parse_relative_days(&lower)
  {
    return shift_days(today, days, raw);
  }

  if let Some(weekday) =
    parse_weekday_name(&lower)
  {
    return Ok(next_weekday_date(
      today, weekday
    ));
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {raw} (use YYYY-MM-DD, today, \
     tomorrow, +N, Nd, Nw or a \
     weekday)"
  ))
}

fn shift_days(
  today: NaiveDate,
  days: i64,
  raw: &str
) -> anyhow::Result<NaiveDate> {
  Duration::try_days(days)
    .and_then(|delta| {
      today.checked_add_signed(delta)
    })
    .ok_or_else(|| {
      anyhow!(
        "date out of range: {raw}"
      )
    })
}

fn parse_relative_days(
  lower: &str
) -> Option<i64> {
  let (sign, rest) = match lower
    .strip_prefix('+')
  {
    | Some(rest) => (1, rest),
    | None => {
      match lower.strip_prefix('-') {
        | Some(rest) => (-1, rest),
        | None => (1, lower)
      }
    }
  };

  let (digits, unit) =
    if let Some(d) =
      rest.strip_suffix('d')
    {
      (d, 1)
    } else if let Some(w) =
      rest.strip_suffix('w')
    {
      (w, 7)
    } else {
      (rest, 1)
    };

  if digits.is_empty()
    || !digits
      .chars()
      .all(|c| c.is_ascii_digit())
  {
    return None;
  }

  // Bare numbers without a sign are
  // ambiguous with years; require a
  // sign or a unit.
  if sign == 1
    && !lower.starts_with('+')
    && digits.len() == rest.len()
  {
    return None;
  }

  let value = digits.parse::<i64>().ok()?;
  value
    .checked_mul(unit)
    .and_then(|v| v.checked_mul(sign))
}

fn parse_weekday_name(
  s: &str
) -> Option<Weekday> {
  match s {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn next_weekday_date(
  today: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let current = today
    .weekday()
    .num_days_from_monday()
    as i64;
  let wanted =
    target.num_days_from_monday() as i64;
  let mut delta =
    (wanted - current).rem_euclid(7);
  if delta == 0 {
    delta = 7;
  }
  today + Duration::days(delta)
}
