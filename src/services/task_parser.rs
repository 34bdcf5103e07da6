//! Turns user text into a scheduled task.
//!
//! Accepted forms (local wall clock at the bot's UTC offset unless stated):
//!
//! * `DD/MM HH:MM - Name` (current year)
//! * `DD/MM/YYYY HH:MM - Name`
//! * `HH:MM - Name` (today)
//! * `<HH:MM UTC+7 DD/MM/YYYY>:Name` (explicit offset)

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use regex::Regex;

use super::address;
use crate::models::{Task, TaskKind};

static DATE_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})/(\d{1,2})(?:/(\d{4}))?\s+(\d{1,2}):(\d{2})\s*-\s*(.+)$")
        .expect("valid date/time regex")
});

static TIME_ONLY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{2})\s*-\s*(.+)$").expect("valid time regex")
});

static BRACKET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*<(\d{1,2}):(\d{2})\s*UTC([+-]\d{1,2})\s*(\d{1,2})/(\d{1,2})/(\d{4})>\s*:(.*)$")
        .expect("valid bracket regex")
});

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTask {
    pub time_utc: DateTime<Utc>,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskParseError {
    Format,
    InvalidDate,
    PastDate,
    EmptyName,
}

impl TaskParseError {
    pub fn user_message(&self) -> &'static str {
        match self {
            TaskParseError::Format => {
                "❌ Wrong format. Use `DD/MM HH:MM - Task name`, e.g. `25/12 09:00 - Claim`."
            }
            TaskParseError::InvalidDate => "❌ That date/time does not exist.",
            TaskParseError::PastDate => "❌ Cannot schedule a reminder in the past.",
            TaskParseError::EmptyName => "❌ The task needs a name.",
        }
    }
}

impl fmt::Display for TaskParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.user_message())
    }
}

fn num<T: std::str::FromStr>(s: Option<regex::Match<'_>>) -> Result<T, TaskParseError> {
    s.and_then(|m| m.as_str().parse::<T>().ok())
        .ok_or(TaskParseError::Format)
}

fn to_utc(
    offset: FixedOffset,
    date: NaiveDate,
    hour: u32,
    minute: u32,
) -> Result<DateTime<Utc>, TaskParseError> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0).ok_or(TaskParseError::InvalidDate)?;
    offset
        .from_local_datetime(&NaiveDateTime::new(date, time))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or(TaskParseError::InvalidDate)
}

fn finish(time_utc: DateTime<Utc>, name: &str, now: DateTime<Utc>) -> Result<ParsedTask, TaskParseError> {
    if time_utc <= now {
        return Err(TaskParseError::PastDate);
    }
    let name = name.trim();
    if name.is_empty() {
        return Err(TaskParseError::EmptyName);
    }
    Ok(ParsedTask {
        time_utc,
        name: name.to_string(),
    })
}

/// True when `text` has the `<HH:MM UTC±H DD/MM/YYYY>:Name` shape.
pub fn is_bracket_form(text: &str) -> bool {
    BRACKET_RE.is_match(text)
}

pub fn parse_task_input(
    text: &str,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> Result<ParsedTask, TaskParseError> {
    let text = text.trim();
    let local_today = now.with_timezone(&offset).date_naive();

    if let Some(c) = BRACKET_RE.captures(text) {
        let hour: u32 = num(c.get(1))?;
        let minute: u32 = num(c.get(2))?;
        let tz_hours: i32 = num(c.get(3))?;
        let day: u32 = num(c.get(4))?;
        let month: u32 = num(c.get(5))?;
        let year: i32 = num(c.get(6))?;

        let explicit = FixedOffset::east_opt(tz_hours * 3600).ok_or(TaskParseError::InvalidDate)?;
        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or(TaskParseError::InvalidDate)?;
        let when = to_utc(explicit, date, hour, minute)?;
        return finish(when, c.get(7).map(|m| m.as_str()).unwrap_or_default(), now);
    }

    if let Some(c) = DATE_TIME_RE.captures(text) {
        let day: u32 = num(c.get(1))?;
        let month: u32 = num(c.get(2))?;
        let year: i32 = match c.get(3) {
            Some(_) => num(c.get(3))?,
            None => local_today.year(),
        };
        let hour: u32 = num(c.get(4))?;
        let minute: u32 = num(c.get(5))?;

        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or(TaskParseError::InvalidDate)?;
        let when = to_utc(offset, date, hour, minute)?;
        return finish(when, c.get(6).map(|m| m.as_str()).unwrap_or_default(), now);
    }

    if let Some(c) = TIME_ONLY_RE.captures(text) {
        let hour: u32 = num(c.get(1))?;
        let minute: u32 = num(c.get(2))?;
        let when = to_utc(offset, local_today, hour, minute)?;
        return finish(when, c.get(3).map(|m| m.as_str()).unwrap_or_default(), now);
    }

    Err(TaskParseError::Format)
}

pub fn parse_simple_task(
    text: &str,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> Result<Task, TaskParseError> {
    let parsed = parse_task_input(text, now, offset)?;
    Ok(Task::simple(parsed.time_utc, parsed.name))
}

/// `DD/MM HH:MM - Name [amount] [contract]`: a trailing contract address and
/// a trailing amount are peeled off the name.
pub fn parse_alpha_task(
    text: &str,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> Result<Task, TaskParseError> {
    let parsed = parse_task_input(text, now, offset)?;

    let mut tokens: Vec<&str> = parsed.name.split_whitespace().collect();

    let contract = match tokens.last() {
        Some(last) if address::is_contract_address(last) => {
            let c = address::normalize(last);
            tokens.pop();
            Some(c)
        }
        _ => None,
    };

    let amount = match tokens.last().map(|t| t.replace(',', "").parse::<f64>()) {
        Some(Ok(v)) if v.is_finite() && v > 0.0 && tokens.len() > 1 => {
            tokens.pop();
            Some(v)
        }
        _ => None,
    };

    let name = tokens.join(" ");
    if name.is_empty() {
        return Err(TaskParseError::EmptyName);
    }

    Ok(Task {
        time_iso: parsed.time_utc,
        name,
        kind: TaskKind::Alpha { amount, contract },
    })
}

/// `09:00 25/12/2025` in the bot's local offset.
pub fn format_local(dt: DateTime<Utc>, offset: FixedOffset) -> String {
    dt.with_timezone(&offset).format("%H:%M %d/%m/%Y").to_string()
}

/// `UTC+7` style label for the configured offset.
pub fn offset_label(offset: FixedOffset) -> String {
    let secs = offset.local_minus_utc();
    let hours = secs / 3600;
    let minutes = (secs.abs() % 3600) / 60;
    if minutes == 0 {
        format!("UTC{hours:+}")
    } else {
        format!("UTC{hours:+}:{minutes:02}")
    }
}
