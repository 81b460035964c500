//! Recurrence rules and their trigger expressions.

use super::ScheduleDomainError;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Timelike, Utc, Weekday};

const TIME_FORMAT: &str = "%H:%M";
const DATE_FORMAT: &str = "%Y-%m-%d";
const EVERY_DAY: &str = "*";

const DAY_TOKENS: [(&str, Weekday); 7] = [
    ("SUN", Weekday::Sun),
    ("MON", Weekday::Mon),
    ("TUE", Weekday::Tue),
    ("WED", Weekday::Wed),
    ("THU", Weekday::Thu),
    ("FRI", Weekday::Fri),
    ("SAT", Weekday::Sat),
];

fn day_token(day: Weekday) -> &'static str {
    DAY_TOKENS
        .iter()
        .find(|(_, weekday)| *weekday == day)
        .map_or(EVERY_DAY, |(token, _)| token)
}

/// Days a weekly schedule fires on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaysOfWeek {
    /// Every day (`*`).
    Every,
    /// The listed days, in request order.
    Only(Vec<Weekday>),
}

impl DaysOfWeek {
    /// Parses `*` or a comma-separated list of `SUN`..`SAT`.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleDomainError::InvalidDayOfWeek`] when any trimmed
    /// token is not an upper-case day abbreviation.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::Weekday;
    /// use citool::schedule::domain::DaysOfWeek;
    ///
    /// let days = DaysOfWeek::parse("MON, FRI").unwrap();
    /// assert_eq!(days, DaysOfWeek::Only(vec![Weekday::Mon, Weekday::Fri]));
    /// assert_eq!(days.cron_field(), "MON,FRI");
    /// ```
    pub fn parse(raw: &str) -> Result<Self, ScheduleDomainError> {
        if raw.trim() == EVERY_DAY {
            return Ok(Self::Every);
        }
        raw.split(',')
            .map(|token| {
                let trimmed = token.trim();
                DAY_TOKENS
                    .iter()
                    .find(|(name, _)| *name == trimmed)
                    .map(|(_, day)| *day)
                    .ok_or_else(|| ScheduleDomainError::InvalidDayOfWeek(raw.to_owned()))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::Only)
    }

    /// Renders the day-of-week field of a trigger expression.
    #[must_use]
    pub fn cron_field(&self) -> String {
        match self {
            Self::Every => EVERY_DAY.to_owned(),
            Self::Only(days) => days
                .iter()
                .map(|day| day_token(*day))
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

/// Weekly or one-shot rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceRule {
    /// Fires on the given days every week.
    Weekly(DaysOfWeek),
    /// Fires once on the given date.
    Once(NaiveDate),
}

/// When a schedule fires: a rule plus a UTC time of day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recurrence {
    time: NaiveTime,
    rule: RecurrenceRule,
}

impl Recurrence {
    /// Validates request fields into a recurrence.
    ///
    /// Exactly one of `day_of_week` and `date` must be non-empty. A one-shot
    /// date and time must lie strictly after `now`.
    ///
    /// # Errors
    ///
    /// Returns the [`ScheduleDomainError`] variant naming the rejected field.
    pub fn parse(
        time: &str,
        day_of_week: Option<&str>,
        date: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Self, ScheduleDomainError> {
        let time_of_day = NaiveTime::parse_from_str(time.trim(), TIME_FORMAT)
            .map_err(|_| ScheduleDomainError::InvalidTime(time.to_owned()))?;
        let days = day_of_week.map(str::trim).filter(|value| !value.is_empty());
        let day = date.map(str::trim).filter(|value| !value.is_empty());

        let rule = match (days, day) {
            (Some(_), Some(_)) => return Err(ScheduleDomainError::ConflictingRecurrence),
            (None, None) => return Err(ScheduleDomainError::MissingRecurrence),
            (Some(raw_days), None) => RecurrenceRule::Weekly(DaysOfWeek::parse(raw_days)?),
            (None, Some(raw_date)) => {
                let parsed = NaiveDate::parse_from_str(raw_date, DATE_FORMAT)
                    .map_err(|_| ScheduleDomainError::InvalidDate(raw_date.to_owned()))?;
                if parsed.and_time(time_of_day).and_utc() <= now {
                    return Err(ScheduleDomainError::NotInFuture(format!(
                        "{raw_date} {}",
                        time_of_day.format(TIME_FORMAT)
                    )));
                }
                RecurrenceRule::Once(parsed)
            }
        };
        Ok(Self {
            time: time_of_day,
            rule,
        })
    }

    /// Returns the UTC time of day.
    #[must_use]
    pub const fn time(&self) -> NaiveTime {
        self.time
    }

    /// Returns the rule.
    #[must_use]
    pub const fn rule(&self) -> &RecurrenceRule {
        &self.rule
    }

    /// Renders the trigger expression.
    ///
    /// Weekly rules give `cron(MM HH ? * DAYS *)`, one-shot rules give
    /// `cron(MM HH DD MM ? YYYY)`.
    #[must_use]
    pub fn cron_expression(&self) -> String {
        let minute = self.time.minute();
        let hour = self.time.hour();
        match &self.rule {
            RecurrenceRule::Weekly(days) => {
                format!("cron({minute:02} {hour:02} ? * {} *)", days.cron_field())
            }
            RecurrenceRule::Once(date) => format!(
                "cron({minute:02} {hour:02} {:02} {:02} ? {})",
                date.day(),
                date.month(),
                date.year()
            ),
        }
    }
}
