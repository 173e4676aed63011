use crate::SCHEDULING_GRACE_SECS;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use regex::{Captures, Regex};
use remindr_infra::ICruxExtractor;
use std::sync::{Arc, LazyLock};
use thiserror::Error;
use tracing::warn;

/// Result of resolving a free-form reminder request: the absolute
/// instant to fire at and the task description to deliver.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedReminder {
    pub fire_time: DateTime<Utc>,
    pub task_text: String,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeResolveError {
    #[error("no recognizable date or time expression in the message")]
    NoTimeExpressionFound,
    #[error("nothing left to remind about once the time expression is removed")]
    NoTaskDescription,
    #[error("the requested time is in the past or less than {SCHEDULING_GRACE_SECS} seconds away")]
    PastOrTooSoon,
}

/// Turns a natural-language reminder request into a fire instant and a
/// task description. Wall-clock times are interpreted in the configured
/// timezone; the returned instant is absolute.
pub struct TimeResolver {
    timezone: Tz,
    crux_extractor: Arc<dyn ICruxExtractor>,
}

impl std::fmt::Debug for TimeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeResolver")
            .field("timezone", &self.timezone)
            .finish()
    }
}

impl TimeResolver {
    pub fn new(timezone: Tz, crux_extractor: Arc<dyn ICruxExtractor>) -> Self {
        Self {
            timezone,
            crux_extractor,
        }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub async fn resolve(
        &self,
        message: &str,
        now: DateTime<Utc>,
    ) -> Result<ResolvedReminder, TimeResolveError> {
        let expression = find_time_expression(message, self.timezone, now)
            .ok_or(TimeResolveError::NoTimeExpressionFound)?;

        let remainder = strip_expression(message, expression.start, expression.end);
        if remainder.is_empty() {
            return Err(TimeResolveError::NoTaskDescription);
        }

        if expression.fire_time <= now + Duration::seconds(SCHEDULING_GRACE_SECS) {
            return Err(TimeResolveError::PastOrTooSoon);
        }

        // The crux extraction is a secondary refinement step. If the
        // collaborator is down we fall back to the raw remainder rather
        // than fail the whole resolution.
        let task_text = match self.crux_extractor.extract(&remainder).await {
            Ok(crux) if !crux.trim().is_empty() => crux.trim().to_string(),
            Ok(_) => remainder,
            Err(e) => {
                warn!("Crux extraction failed, using the raw task text: {:?}", e);
                remainder
            }
        };

        Ok(ResolvedReminder {
            fire_time: expression.fire_time,
            task_text,
        })
    }
}

struct TimeExpression {
    start: usize,
    end: usize,
    fire_time: DateTime<Utc>,
}

const DAY_WORDS: &str = "today|tomorrow|tonight";
const WEEKDAYS: &str = "monday|tuesday|wednesday|thursday|friday|saturday|sunday";
// Clock with an optional meridiem: "5", "5:30", "5 pm", "17:45", "noon".
const CLOCK: &str =
    r"(?:(?P<h>\d{1,2})(?::(?P<min>\d{2}))?\s*(?P<mer>am|pm)?|(?P<noon>noon)|(?P<mid>midnight))";
// Clock that stands on its own, so a bare hour is only accepted with a
// colon or meridiem ("5pm", "17:30" - but not the "5" in "buy 5 eggs").
const BARE_CLOCK: &str = r"(?:(?P<h>\d{1,2}):(?P<min>\d{2})\s*(?P<mer>am|pm)?|(?P<h2>\d{1,2})\s*(?P<mer2>am|pm)|(?P<noon>noon)|(?P<mid>midnight))";

static RELATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bin\s+(?P<n>\d+)\s*(?P<unit>seconds?|secs?|minutes?|mins?|hours?|hrs?|days?|weeks?)\b",
    )
    .unwrap()
});
static DAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?P<day>{DAY_WORDS})(?:\s+at\s+{CLOCK})?\b"
    ))
    .unwrap()
});
static WEEKDAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:on\s+)?(?P<wd>{WEEKDAYS})(?:\s+at\s+{CLOCK})?\b"
    ))
    .unwrap()
});
// A clock time may carry a trailing day reference: "at 3 pm tomorrow",
// "5pm on friday".
static AT_CLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\bat\s+{CLOCK}(?:\s+(?:(?P<sday>{DAY_WORDS})|(?:on\s+)?(?P<swd>{WEEKDAYS})))?\b"
    ))
    .unwrap()
});
static BARE_CLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b{BARE_CLOCK}(?:\s+(?:(?P<sday>{DAY_WORDS})|(?:on\s+)?(?P<swd>{WEEKDAYS})))?\b"
    ))
    .unwrap()
});

/// Finds the leftmost recognizable time expression in the message and
/// resolves it against `now` in the given timezone. Expressions that
/// parse but name an impossible time (hour 27, minute 75, a wall-clock
/// time that does not exist in the zone) are treated as no match.
fn find_time_expression(message: &str, tz: Tz, now: DateTime<Utc>) -> Option<TimeExpression> {
    let local_now = now.with_timezone(&tz);
    let mut candidates = Vec::new();

    if let Some(caps) = RELATIVE_RE.captures(message) {
        if let Some(expr) = relative_expression(&caps, now) {
            candidates.push(expr);
        }
    }
    if let Some(caps) = DAY_RE.captures(message) {
        if let Some(expr) = day_expression(&caps, tz, &local_now) {
            candidates.push(expr);
        }
    }
    if let Some(caps) = WEEKDAY_RE.captures(message) {
        if let Some(expr) = weekday_expression(&caps, tz, &local_now) {
            candidates.push(expr);
        }
    }
    for re in [&AT_CLOCK_RE, &BARE_CLOCK_RE] {
        if let Some(caps) = re.captures(message) {
            if let Some(expr) = clock_expression(&caps, tz, &local_now) {
                candidates.push(expr);
            }
        }
    }

    // Leftmost match wins; on a tie the longer expression does.
    candidates
        .into_iter()
        .min_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)))
}

fn relative_expression(caps: &Captures, now: DateTime<Utc>) -> Option<TimeExpression> {
    let full = caps.get(0).unwrap();
    let n: i64 = caps.name("n")?.as_str().parse().ok()?;
    let unit = caps.name("unit")?.as_str().to_ascii_lowercase();
    let seconds_per = match unit.as_str() {
        u if u.starts_with("sec") => 1,
        u if u.starts_with("min") => 60,
        u if u.starts_with("h") => 3600,
        u if u.starts_with("day") => 86_400,
        _ => 604_800, // weeks
    };
    // Absurdly large offsets overflow the duration or timestamp range;
    // treat them like any other impossible time.
    let offset = Duration::try_seconds(n.checked_mul(seconds_per)?)?;
    let fire_time = now.checked_add_signed(offset)?;
    Some(TimeExpression {
        start: full.start(),
        end: full.end(),
        fire_time,
    })
}

fn day_expression(caps: &Captures, tz: Tz, local_now: &DateTime<Tz>) -> Option<TimeExpression> {
    let full = caps.get(0).unwrap();
    let day = caps.name("day")?.as_str().to_ascii_lowercase();
    let (date, default_time) = day_base(&day, local_now);
    let (hour, minute) = match clock_from_caps(caps, "h", "min", "mer") {
        ClockParse::Absent => default_time,
        ClockParse::Valid {
            hour,
            minute,
            explicit_meridiem,
        } => (
            apply_evening_rule(&day, hour, explicit_meridiem),
            minute,
        ),
        ClockParse::Invalid => return None,
    };
    instant_from_local(date, hour, minute, tz).map(|fire_time| TimeExpression {
        start: full.start(),
        end: full.end(),
        fire_time,
    })
}

fn weekday_expression(caps: &Captures, tz: Tz, local_now: &DateTime<Tz>) -> Option<TimeExpression> {
    let full = caps.get(0).unwrap();
    let date = weekday_base(caps.name("wd")?.as_str(), local_now);
    let (hour, minute) = match clock_from_caps(caps, "h", "min", "mer") {
        ClockParse::Absent => (9, 0),
        ClockParse::Valid { hour, minute, .. } => (hour, minute),
        ClockParse::Invalid => return None,
    };
    instant_from_local(date, hour, minute, tz).map(|fire_time| TimeExpression {
        start: full.start(),
        end: full.end(),
        fire_time,
    })
}

fn clock_expression(caps: &Captures, tz: Tz, local_now: &DateTime<Tz>) -> Option<TimeExpression> {
    let full = caps.get(0).unwrap();
    let clock = match clock_from_caps(caps, "h", "min", "mer") {
        ClockParse::Absent => clock_from_caps(caps, "h2", "", "mer2"),
        parse => parse,
    };
    let ClockParse::Valid {
        hour,
        minute,
        explicit_meridiem,
    } = clock
    else {
        return None;
    };

    let suffix_day = caps.name("sday").map(|d| d.as_str().to_ascii_lowercase());
    let date = if let Some(day) = &suffix_day {
        day_base(day, local_now).0
    } else if let Some(wd) = caps.name("swd") {
        weekday_base(wd.as_str(), local_now)
    } else {
        local_now.date_naive()
    };
    let hour = match &suffix_day {
        Some(day) => apply_evening_rule(day, hour, explicit_meridiem),
        None => hour,
    };

    instant_from_local(date, hour, minute, tz).map(|fire_time| TimeExpression {
        start: full.start(),
        end: full.end(),
        fire_time,
    })
}

enum ClockParse {
    Absent,
    Valid {
        hour: u32,
        minute: u32,
        explicit_meridiem: bool,
    },
    Invalid,
}

fn clock_from_caps(caps: &Captures, h_name: &str, min_name: &str, mer_name: &str) -> ClockParse {
    if caps.name("noon").is_some() {
        return ClockParse::Valid {
            hour: 12,
            minute: 0,
            explicit_meridiem: true,
        };
    }
    if caps.name("mid").is_some() {
        return ClockParse::Valid {
            hour: 0,
            minute: 0,
            explicit_meridiem: true,
        };
    }
    let Some(h) = caps.name(h_name) else {
        return ClockParse::Absent;
    };
    let hour: u32 = match h.as_str().parse() {
        Ok(h) => h,
        Err(_) => return ClockParse::Invalid,
    };
    let minute_str = if min_name.is_empty() {
        "0"
    } else {
        caps.name(min_name).map(|m| m.as_str()).unwrap_or("0")
    };
    let minute: u32 = match minute_str.parse() {
        Ok(m) => m,
        Err(_) => return ClockParse::Invalid,
    };
    if minute > 59 {
        return ClockParse::Invalid;
    }

    match caps.name(mer_name) {
        Some(mer) => {
            if !(1..=12).contains(&hour) {
                return ClockParse::Invalid;
            }
            let is_pm = mer.as_str().eq_ignore_ascii_case("pm");
            let hour = match (is_pm, hour) {
                (false, 12) => 0,
                (false, h) => h,
                (true, 12) => 12,
                (true, h) => h + 12,
            };
            ClockParse::Valid {
                hour,
                minute,
                explicit_meridiem: true,
            }
        }
        None => {
            if hour > 23 {
                return ClockParse::Invalid;
            }
            ClockParse::Valid {
                hour,
                minute,
                explicit_meridiem: false,
            }
        }
    }
}

/// "tonight at 8" means 20:00 even though no meridiem was given.
fn apply_evening_rule(day: &str, hour: u32, explicit_meridiem: bool) -> u32 {
    if day == "tonight" && !explicit_meridiem && (1..=11).contains(&hour) {
        hour + 12
    } else {
        hour
    }
}

fn day_base(day: &str, local_now: &DateTime<Tz>) -> (NaiveDate, (u32, u32)) {
    let today = local_now.date_naive();
    match day {
        "tomorrow" => (today + Duration::days(1), (9, 0)),
        "tonight" => (today, (20, 0)),
        // "today"
        _ => (today, (9, 0)),
    }
}

/// The next occurrence of the named weekday, counting today.
fn weekday_base(weekday: &str, local_now: &DateTime<Tz>) -> NaiveDate {
    let target = match weekday.to_ascii_lowercase().as_str() {
        "monday" => Weekday::Mon,
        "tuesday" => Weekday::Tue,
        "wednesday" => Weekday::Wed,
        "thursday" => Weekday::Thu,
        "friday" => Weekday::Fri,
        "saturday" => Weekday::Sat,
        _ => Weekday::Sun,
    };
    let today = local_now.date_naive();
    let days_ahead = (target.num_days_from_monday() as i64
        - today.weekday().num_days_from_monday() as i64)
        .rem_euclid(7);
    today + Duration::days(days_ahead)
}

fn instant_from_local(date: NaiveDate, hour: u32, minute: u32, tz: Tz) -> Option<DateTime<Utc>> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
    // An ambiguous local time (DST fold) resolves to the earliest
    // instant; a nonexistent one (DST gap) is treated as no match.
    tz.from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Removes the matched time expression and normalizes the remainder.
fn strip_expression(message: &str, start: usize, end: usize) -> String {
    let mut remainder = String::with_capacity(message.len());
    remainder.push_str(&message[..start]);
    remainder.push(' ');
    remainder.push_str(&message[end..]);
    remainder
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| {
            c.is_whitespace() || matches!(c, ',' | '.' | ';' | ':' | '!' | '-')
        })
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{FailingCrux, StaticCrux};

    fn ny() -> Tz {
        "America/New_York".parse().unwrap()
    }

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        ny().with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn resolver_with(crux: Arc<dyn ICruxExtractor>) -> TimeResolver {
        TimeResolver::new(ny(), crux)
    }

    fn parse_at(message: &str, now: DateTime<Utc>) -> Option<(DateTime<Utc>, String)> {
        find_time_expression(message, ny(), now)
            .map(|e| (e.fire_time, strip_expression(message, e.start, e.end)))
    }

    #[test]
    fn parses_afternoon_clock_time_as_today() {
        let now = local(2026, 3, 2, 10, 0);
        let (fire, task) = parse_at("Remind me to call Vaibhav at 5 pm", now).unwrap();
        assert_eq!(fire, local(2026, 3, 2, 17, 0));
        assert_eq!(task, "Remind me to call Vaibhav");
    }

    #[test]
    fn parses_relative_offsets() {
        let now = local(2026, 3, 2, 10, 0);
        let (fire, task) = parse_at("submit the report in 2 hours", now).unwrap();
        assert_eq!(fire, now + Duration::hours(2));
        assert_eq!(task, "submit the report");

        let (fire, _) = parse_at("stretch in 45 mins", now).unwrap();
        assert_eq!(fire, now + Duration::minutes(45));
    }

    #[test]
    fn parses_day_words_with_and_without_clock() {
        let now = local(2026, 3, 2, 10, 0);
        let (fire, task) = parse_at("buy milk tomorrow at 8 AM", now).unwrap();
        assert_eq!(fire, local(2026, 3, 3, 8, 0));
        assert_eq!(task, "buy milk");

        // No clock time defaults to 09:00 local.
        let (fire, _) = parse_at("buy milk tomorrow", now).unwrap();
        assert_eq!(fire, local(2026, 3, 3, 9, 0));

        let (fire, _) = parse_at("take out the trash tonight", now).unwrap();
        assert_eq!(fire, local(2026, 3, 2, 20, 0));

        // A bare evening hour after "tonight" reads as pm.
        let (fire, _) = parse_at("take out the trash tonight at 8", now).unwrap();
        assert_eq!(fire, local(2026, 3, 2, 20, 0));
    }

    #[test]
    fn parses_weekdays_as_next_occurrence() {
        // 2026-03-02 is a Monday.
        let now = local(2026, 3, 2, 10, 0);
        let (fire, task) = parse_at("team sync on friday at noon", now).unwrap();
        assert_eq!(fire, local(2026, 3, 6, 12, 0));
        assert_eq!(task, "team sync");

        // The same weekday counts as today, not next week.
        let (fire, _) = parse_at("standup on monday at 11 am", now).unwrap();
        assert_eq!(fire, local(2026, 3, 2, 11, 0));
    }

    #[test]
    fn parses_clock_with_trailing_day_reference() {
        let now = local(2026, 3, 2, 10, 0);
        let (fire, task) = parse_at("call mom at 3 pm tomorrow", now).unwrap();
        assert_eq!(fire, local(2026, 3, 3, 15, 0));
        assert_eq!(task, "call mom");

        let (fire, _) = parse_at("dentist at 9:15 on wednesday", now).unwrap();
        assert_eq!(fire, local(2026, 3, 4, 9, 15));
    }

    #[test]
    fn picks_the_leftmost_expression() {
        let now = local(2026, 3, 2, 10, 0);
        let (fire, _) = parse_at("in 30 minutes remind me about the 5 pm call", now).unwrap();
        assert_eq!(fire, now + Duration::minutes(30));
    }

    #[test]
    fn treats_overflowing_relative_offsets_as_no_match() {
        let now = local(2026, 3, 2, 10, 0);
        // Parses as i64 but exceeds the representable duration range.
        assert!(parse_at("ping me in 10000000000000000 seconds", now).is_none());
        // Overflows when converted to seconds.
        assert!(parse_at("check in 99999999999999 weeks", now).is_none());
        // Does not even fit in the number type.
        assert!(parse_at("nudge me in 99999999999999999999 minutes", now).is_none());
    }

    #[test]
    fn rejects_impossible_clock_values() {
        let now = local(2026, 3, 2, 10, 0);
        assert!(parse_at("meet at 27:80", now).is_none());
        assert!(parse_at("buy 5 eggs", now).is_none());
        assert!(parse_at("no time here at all", now).is_none());
    }

    #[tokio::test]
    async fn resolves_with_crux_refinement() {
        let resolver = resolver_with(Arc::new(StaticCrux("call Vaibhav".into())));
        let now = local(2026, 3, 2, 10, 0);

        let resolved = resolver
            .resolve("Remind me to call Vaibhav at 5 pm", now)
            .await
            .unwrap();
        assert_eq!(resolved.fire_time, local(2026, 3, 2, 17, 0));
        assert_eq!(resolved.task_text, "call Vaibhav");
    }

    #[tokio::test]
    async fn falls_back_to_raw_text_when_refinement_fails() {
        let resolver = resolver_with(Arc::new(FailingCrux));
        let now = local(2026, 3, 2, 10, 0);

        let resolved = resolver
            .resolve("Remind me to water the plants in 2 hours", now)
            .await
            .unwrap();
        assert_eq!(resolved.task_text, "Remind me to water the plants");
    }

    #[tokio::test]
    async fn fails_without_time_expression() {
        let resolver = resolver_with(Arc::new(FailingCrux));
        let now = local(2026, 3, 2, 10, 0);

        assert_eq!(
            resolver.resolve("call Vaibhav", now).await,
            Err(TimeResolveError::NoTimeExpressionFound)
        );
    }

    #[tokio::test]
    async fn fails_without_task_description() {
        let resolver = resolver_with(Arc::new(FailingCrux));
        let now = local(2026, 3, 2, 10, 0);

        assert_eq!(
            resolver.resolve("at 5 pm", now).await,
            Err(TimeResolveError::NoTaskDescription)
        );
    }

    #[tokio::test]
    async fn rejects_past_and_too_soon_times() {
        let resolver = resolver_with(Arc::new(FailingCrux));
        // 18:00: 5 pm today is already gone.
        let evening = local(2026, 3, 2, 18, 0);
        assert_eq!(
            resolver.resolve("call Vaibhav at 5 pm", evening).await,
            Err(TimeResolveError::PastOrTooSoon)
        );

        // Inside the grace buffer.
        let now = local(2026, 3, 2, 10, 0);
        assert_eq!(
            resolver.resolve("stretch in 5 seconds", now).await,
            Err(TimeResolveError::PastOrTooSoon)
        );
    }
}
