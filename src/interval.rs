use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::timezone::{self, TimeError, ZonedWallClock};

/// Everything the scheduling form collects before submission. Start and end
/// are wall-clock readings in whichever zone the operator chose; conversion
/// to instants happens here, at validation time, so flipping the active zone
/// just re-runs validation over the same fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingDraft {
    pub channel_id: String,
    pub title: String,
    pub start: ZonedWallClock,
    pub end: ZonedWallClock,
}

impl RecordingDraft {
    /// Fresh draft for a channel: starts now, runs one hour, expressed on
    /// the clock of `zone`.
    pub fn starting_now(
        channel_id: impl Into<String>,
        zone: &str,
    ) -> Result<RecordingDraft, TimeError> {
        let now = Utc::now();
        Ok(RecordingDraft {
            channel_id: channel_id.into(),
            title: String::new(),
            start: timezone::to_zoned_wall_clock(now, zone)?,
            end: timezone::to_zoned_wall_clock(now + Duration::hours(1), zone)?,
        })
    }

    /// Reinterpret both wall clocks in another zone, keeping the digits.
    pub fn in_zone(&self, zone: &str) -> RecordingDraft {
        RecordingDraft {
            channel_id: self.channel_id.clone(),
            title: self.title.clone(),
            start: self.start.in_zone(zone),
            end: self.end.in_zone(zone),
        }
    }
}

/// The instant pair a draft resolves to once accepted. This is the only
/// form the gateway ever sees; `start < end` holds by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("end time must be after start time")]
    EndNotAfterStart,
    #[error(transparent)]
    Time(#[from] TimeError),
}

/// Check a draft and resolve it to a UTC interval. Purely local, runs before
/// every create/update submission. Out-of-order input is reported, never
/// reordered.
pub fn validate(draft: &RecordingDraft) -> Result<ValidatedInterval, ValidationError> {
    if draft.channel_id.trim().is_empty() {
        return Err(ValidationError::MissingField("channel"));
    }
    if draft.title.trim().is_empty() {
        return Err(ValidationError::MissingField("title"));
    }
    if draft.start.zone.trim().is_empty() || draft.end.zone.trim().is_empty() {
        return Err(ValidationError::MissingField("time zone"));
    }

    let start = timezone::to_utc_instant(&draft.start)?;
    let end = timezone::to_utc_instant(&draft.end)?;

    if end <= start {
        return Err(ValidationError::EndNotAfterStart);
    }

    Ok(ValidatedInterval { start, end })
}

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

    use super::{validate, RecordingDraft, ValidationError};
    use crate::timezone::ZonedWallClock;

    fn tokyo_draft(start: &str, end: &str) -> RecordingDraft {
        let wall = |time: &str| {
            ZonedWallClock::new(
                NaiveDate::from_str("2024-03-10").unwrap(),
                NaiveTime::from_str(time).unwrap(),
                "Asia/Tokyo",
            )
        };
        RecordingDraft {
            channel_id: "ch-1".to_string(),
            title: "evening news".to_string(),
            start: wall(start),
            end: wall(end),
        }
    }

    #[test]
    pub fn test_accepts_ordered_interval() {
        let interval = validate(&tokyo_draft("09:00:00", "10:00:00")).unwrap();
        assert_eq!(
            interval.start,
            DateTime::<Utc>::from_str("2024-03-10T00:00:00Z").unwrap()
        );
        assert_eq!(
            interval.end,
            DateTime::<Utc>::from_str("2024-03-10T01:00:00Z").unwrap()
        );
    }

    #[test]
    pub fn test_rejects_equal_and_reversed() {
        assert_eq!(
            validate(&tokyo_draft("09:00:00", "09:00:00")).unwrap_err(),
            ValidationError::EndNotAfterStart
        );
        assert_eq!(
            validate(&tokyo_draft("10:00:00", "09:30:00")).unwrap_err(),
            ValidationError::EndNotAfterStart
        );
    }

    #[test]
    pub fn test_one_minute_interval_passes() {
        let interval = validate(&tokyo_draft("09:00:00", "09:01:00")).unwrap();
        assert!(interval.start < interval.end);
    }

    #[test]
    pub fn test_blank_fields() {
        let mut draft = tokyo_draft("09:00:00", "10:00:00");
        draft.title = "   ".to_string();
        assert_eq!(
            validate(&draft).unwrap_err(),
            ValidationError::MissingField("title")
        );

        let mut draft = tokyo_draft("09:00:00", "10:00:00");
        draft.channel_id = String::new();
        assert_eq!(
            validate(&draft).unwrap_err(),
            ValidationError::MissingField("channel")
        );
    }

    #[test]
    pub fn test_default_draft_runs_one_hour() {
        let draft = RecordingDraft::starting_now("ch-1", "Asia/Tokyo").unwrap();
        // No title yet, so it does not validate as-is.
        assert!(validate(&draft).is_err());

        let mut draft = draft;
        draft.title = "untitled".to_string();
        let interval = validate(&draft).unwrap();
        assert_eq!(interval.end - interval.start, chrono::Duration::hours(1));
    }

    #[test]
    pub fn test_zone_switch_rederives_instants() {
        // 09:00-10:00 read in London instead of Tokyo is nine hours later
        // in absolute terms (the UK is still on GMT in early March).
        let draft = tokyo_draft("09:00:00", "10:00:00");
        let rezoned = draft.in_zone("Europe/London");

        let tokyo = validate(&draft).unwrap();
        let london = validate(&rezoned).unwrap();
        assert_eq!(
            london.start,
            DateTime::<Utc>::from_str("2024-03-10T09:00:00Z").unwrap()
        );
        assert_ne!(tokyo.start, london.start);
        // Duration is preserved across the switch.
        assert_eq!(tokyo.end - tokyo.start, london.end - london.start);
    }
}
