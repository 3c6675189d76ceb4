//! Duration annotations embedded in task titles
//!
//! A task title can carry one or more bracketed durations such as
//! `"Write report [1h]"`, `"Cook dinner [2h30m] [15m]"` or
//! `"Leer [15 minutos]"`. Every bracket whose content follows the grammar
//! `<qty><unit?> <qty2?><unit2?>` contributes to the total; anything else in
//! brackets is ignored.

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

/// Any bracket pair without nested brackets
pub(crate) static BRACKET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\[\]]*)\]").unwrap());

/// Content of a single bracket: first quantity with optional unit, optionally
/// followed by a second quantity with optional unit.
static GROUP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d+)\s*([[:alpha:]]+)?\s*(?:(\d+)\s*([[:alpha:]]+)?)?\s*$").unwrap()
});

const HOUR_UNITS: &[&str] = &["h", "hr", "hrs", "hour", "hours", "hora", "horas"];
const MINUTE_UNITS: &[&str] = &["m", "min", "mins", "minute", "minutes", "minuto", "minutos"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Hour,
    Minute,
}

fn classify_unit(token: &str) -> Option<Unit> {
    let token = token.to_lowercase();
    if HOUR_UNITS.contains(&token.as_str()) {
        Some(Unit::Hour)
    } else if MINUTE_UNITS.contains(&token.as_str()) {
        Some(Unit::Minute)
    } else {
        None
    }
}

/// Parse the inside of one bracket into minutes.
///
/// Returns `None` when the content does not follow the annotation grammar.
/// A first quantity without a unit is only accepted on its own (`[25]`); the
/// second quantity is always minutes (`[2h30]`, `[2 hours 30 minutes]`).
pub(crate) fn parse_group(content: &str) -> Option<u32> {
    let caps = GROUP_RE.captures(content)?;

    let first_qty: u32 = caps.get(1)?.as_str().parse().ok()?;
    let second_qty = match caps.get(3) {
        Some(m) => Some(m.as_str().parse::<u32>().ok()?),
        None => None,
    };

    let first = match caps.get(2) {
        Some(unit) => match classify_unit(unit.as_str())? {
            Unit::Hour => first_qty.checked_mul(60)?,
            Unit::Minute => first_qty,
        },
        None if second_qty.is_some() => return None,
        None => first_qty,
    };

    let second = match (second_qty, caps.get(4)) {
        (Some(qty), Some(unit)) if classify_unit(unit.as_str()) == Some(Unit::Minute) => qty,
        (Some(_), Some(_)) => return None,
        (Some(qty), None) => qty,
        (None, _) => 0,
    };

    first.checked_add(second)
}

/// Result of scanning a title for annotations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DurationAnnotation {
    /// Number of bracket pairs found, parseable or not
    pub brackets: usize,
    /// Number of brackets that followed the annotation grammar
    pub parsed: usize,
    /// Sum of all parsed brackets, in minutes
    pub minutes: u32,
}

impl DurationAnnotation {
    /// Scan the whole title, summing every well-formed bracket.
    pub fn scan(title: &str) -> Self {
        let mut annotation = Self::default();
        for caps in BRACKET_RE.captures_iter(title) {
            annotation.brackets += 1;
            match parse_group(&caps[1]) {
                Some(minutes) => {
                    annotation.parsed += 1;
                    annotation.minutes = annotation.minutes.saturating_add(minutes);
                }
                None => debug!("Ignoring malformed duration annotation '{}'", &caps[0]),
            }
        }
        annotation
    }

    /// Minutes to schedule, or `None` if no bracket carried a usable duration.
    pub fn usable_minutes(&self) -> Option<u32> {
        (self.parsed > 0).then_some(self.minutes)
    }
}

/// Extract the total annotated duration of a title in minutes.
///
/// `None` means the title has no bracket at all. A title whose brackets are
/// all empty or unparsable yields `Some(0)`.
pub fn extract_duration(title: &str) -> Option<u32> {
    let annotation = DurationAnnotation::scan(title);
    (annotation.brackets > 0).then_some(annotation.minutes)
}
