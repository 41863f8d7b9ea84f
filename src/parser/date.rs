//! Date header parsing.
//!
//! Date headers in decades-old archives are a mess: parenthetical timezone
//! names, bare abbreviations, truncated offsets like `+200`. Parsing runs a
//! cascade of strategies from strict RFC 2822 down to `mail-parser`'s
//! permissive parser, and fails loudly only when every strategy is exhausted.
//!
//! Results keep their parsed UTC offset so that formatting reflects the
//! sender's wall-clock time, not a normalized UTC instant.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use mail_parser::MessageParser;
use tracing::debug;

use crate::error::{DetachError, Result};

/// Timezone abbreviation table: maps non-standard zone names to UTC offsets
/// in seconds.
///
/// Passed explicitly into [`parse_date_header`] so deployments with unusual
/// archives can extend it (see the `[timezones]` config table) and tests can
/// swap it out.
#[derive(Debug, Clone)]
pub struct TzTable {
    entries: Vec<(String, i32)>,
}

impl Default for TzTable {
    fn default() -> Self {
        let entries = [
            ("EST", -5 * 3600),
            ("EDT", -4 * 3600),
            ("CST", -6 * 3600),
            ("CDT", -5 * 3600),
            ("MST", -7 * 3600),
            ("MDT", -6 * 3600),
            ("PST", -8 * 3600),
            ("PDT", -7 * 3600),
            ("GMT", 0),
            ("UT", 0),
            ("UTC", 0),
            ("CET", 3600),
            ("CEST", 2 * 3600),
            ("JST", 9 * 3600),
        ];
        Self {
            entries: entries
                .iter()
                .map(|(name, secs)| (name.to_string(), *secs))
                .collect(),
        }
    }
}

impl TzTable {
    /// Add or override one abbreviation.
    pub fn insert(&mut self, abbrev: &str, offset_seconds: i32) {
        if let Some(entry) = self.entries.iter_mut().find(|(name, _)| name == abbrev) {
            entry.1 = offset_seconds;
        } else {
            self.entries.push((abbrev.to_string(), offset_seconds));
        }
    }

    fn offset_for(&self, abbrev: &str) -> Option<FixedOffset> {
        self.entries
            .iter()
            .find(|(name, _)| name == abbrev)
            .and_then(|(_, secs)| FixedOffset::east_opt(*secs))
    }
}

/// Parse a raw Date header into a zone-aware timestamp.
///
/// Strategies, in order:
/// 1. strict RFC 2822;
/// 2. strip a trailing parenthetical annotation (e.g. `(EDT)`), retry strict;
/// 3. lenient: day-of-week stripping, fallback formats, the abbreviation
///    table, and finally `mail-parser`'s permissive parser;
/// 4. strip a malformed short offset (`+` followed by fewer than 4 digits),
///    retry without timezone, then retry lenient.
///
/// Exhausting all strategies is an error carrying the raw header value.
pub fn parse_date_header(raw: &str, tz: &TzTable) -> Result<DateTime<FixedOffset>> {
    let mut value = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Ok(dt);
    }

    if let Some(idx) = value.find(" (") {
        debug!(date = raw, "Stripping parenthetical annotation from Date header");
        value = value[..idx].trim_end();
        if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
            return Ok(dt);
        }
    }

    if let Some(dt) = parse_lenient(value, tz) {
        return Ok(dt);
    }

    if let Some(stripped) = strip_short_offset(value) {
        if let Ok(naive) = NaiveDateTime::parse_from_str(stripped, "%a, %d %b %Y %H:%M:%S") {
            return Ok(naive.and_utc().fixed_offset());
        }
        if let Some(dt) = parse_lenient(stripped, tz) {
            return Ok(dt);
        }
    }

    Err(DetachError::DateParse(raw.to_string()))
}

/// Formats with an explicit numeric offset.
const OFFSET_FORMATS: &[&str] = &[
    "%d %b %Y %H:%M:%S %z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S %z",
];

/// Formats without any timezone information; results are taken as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%d %b %Y %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

fn parse_lenient(s: &str, tz: &TzTable) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }

    let no_dow = strip_day_of_week(s);

    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&no_dow, fmt) {
            return Some(dt);
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&no_dow, fmt) {
            return Some(naive.and_utc().fixed_offset());
        }
    }

    // Trailing timezone abbreviation, e.g. "04 Jan 2024 10:00:00 EST"
    if let Some((prefix, abbrev)) = no_dow.rsplit_once(' ') {
        if let Some(offset) = tz.offset_for(abbrev) {
            for fmt in NAIVE_FORMATS {
                if let Ok(naive) = NaiveDateTime::parse_from_str(prefix.trim_end(), fmt) {
                    return offset.from_local_datetime(&naive).single();
                }
            }
        }
    }

    mail_parser_date(s)
}

/// Last resort: let `mail-parser` have a go at the raw value.
fn mail_parser_date(input: &str) -> Option<DateTime<FixedOffset>> {
    // Wrap input in a minimal RFC 5322 message so mail-parser can parse it
    let fake_msg = format!("Date: {input}\n\n");
    let parsed = MessageParser::default().parse(fake_msg.as_bytes())?;
    let rfc3339 = parsed.date()?.to_rfc3339();
    DateTime::parse_from_rfc3339(&rfc3339).ok()
}

/// Strip leading day-of-week prefix (e.g. "Thu, " or "Thu ").
fn strip_day_of_week(s: &str) -> String {
    let days = [
        "Mon,", "Tue,", "Wed,", "Thu,", "Fri,", "Sat,", "Sun,", "Mon ", "Tue ", "Wed ", "Thu ",
        "Fri ", "Sat ", "Sun ",
    ];
    for day in &days {
        if let Some(rest) = s.strip_prefix(day) {
            return rest.trim().to_string();
        }
    }
    s.to_string()
}

/// Detect a trailing ` +NNN` offset fragment with fewer than 4 digits and
/// return the value without it.
fn strip_short_offset(s: &str) -> Option<&str> {
    let idx = s.rfind(" +")?;
    let digits = &s[idx + 2..];
    if digits.is_empty() || digits.len() >= 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(s[..idx].trim_end())
}
