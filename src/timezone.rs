use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A wall-clock reading in a named IANA zone. Only exists while a schedule
/// is being edited; the canonical form of every stored time is a UTC instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZonedWallClock {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub zone: String,
}

impl ZonedWallClock {
    pub fn new(date: NaiveDate, time: NaiveTime, zone: impl Into<String>) -> Self {
        Self {
            date,
            time,
            zone: zone.into(),
        }
    }

    /// Same wall-clock fields reinterpreted in a different zone. Used when
    /// the operator flips between the channel zone and their own zone: the
    /// digits on the form stay put, the instant they mean changes.
    pub fn in_zone(&self, zone: impl Into<String>) -> Self {
        Self {
            date: self.date,
            time: self.time,
            zone: zone.into(),
        }
    }

    /// `YYYY-MM-DD HH:MM`, the same shape the backend uses for
    /// channel-local times in its conversion confirmations.
    pub fn label(&self) -> String {
        format!(
            "{} {}",
            self.date.format("%Y-%m-%d"),
            self.time.format("%H:%M")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    #[error("unknown time zone: {0}")]
    UnknownZone(String),
}

/// Interpret a wall-clock reading as an absolute instant, using the zone's
/// offset rules as of that calendar date.
///
/// DST resolution is deterministic:
/// - a fall-back overlap resolves to the *earlier* of the two candidate
///   instants (the pre-transition offset);
/// - a spring-forward gap resolves to the first wall-clock minute at or
///   after the gap that exists on that zone's clock.
pub fn to_utc_instant(wall: &ZonedWallClock) -> Result<DateTime<Utc>, TimeError> {
    let tz = parse_zone(&wall.zone)?;
    let naive = wall.date.and_time(wall.time);
    Ok(resolve_local(tz, naive).with_timezone(&Utc))
}

/// Render an absolute instant as the date and time-of-day an observer in the
/// named zone would read at that moment. Inverse of [`to_utc_instant`] for
/// every instant whose wall-clock rendering is unambiguous in the zone.
pub fn to_zoned_wall_clock(
    instant: DateTime<Utc>,
    zone: &str,
) -> Result<ZonedWallClock, TimeError> {
    let tz = parse_zone(zone)?;
    let local = instant.with_timezone(&tz);
    Ok(ZonedWallClock {
        date: local.date_naive(),
        time: local.time(),
        zone: zone.to_string(),
    })
}

/// Instant rendered as a `YYYY-MM-DD HH:MM` label in the named zone.
pub fn format_in_zone(instant: DateTime<Utc>, zone: &str) -> Result<String, TimeError> {
    Ok(to_zoned_wall_clock(instant, zone)?.label())
}

fn parse_zone(zone: &str) -> Result<Tz, TimeError> {
    zone.parse::<Tz>()
        .map_err(|_| TimeError::UnknownZone(zone.to_string()))
}

fn resolve_local(tz: Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earlier, _) => earlier,
        LocalResult::None => {
            // Inside a spring-forward gap. Walk forward a minute at a time
            // until the clock exists again; gaps are bounded (the largest on
            // record skipped a whole day), so this terminates.
            let mut probe = naive;
            loop {
                probe += Duration::minutes(1);
                match tz.from_local_datetime(&probe) {
                    LocalResult::Single(dt) => break dt,
                    LocalResult::Ambiguous(earlier, _) => break earlier,
                    LocalResult::None => continue,
                }
            }
        }
    }
}
