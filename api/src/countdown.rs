use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeLeft {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    Until(TimeLeft),
    /// The start time has been reached.
    Live,
}

/// Whole days/hours/minutes/seconds from `now` until `start`, rounded down.
pub fn time_until(start: DateTime<Utc>, now: DateTime<Utc>) -> Countdown {
    let remaining = (start - now).num_milliseconds();
    if remaining <= 0 {
        return Countdown::Live;
    }
    let total_seconds = remaining / 1000;
    Countdown::Until(TimeLeft {
        days: total_seconds / 86_400,
        hours: (total_seconds % 86_400) / 3_600,
        minutes: (total_seconds % 3_600) / 60,
        seconds: total_seconds % 60,
    })
}

impl Countdown {
    pub fn is_live(&self) -> bool {
        matches!(self, Countdown::Live)
    }

    pub fn display(&self) -> String {
        match self {
            Countdown::Live => "LIVE NOW".to_string(),
            Countdown::Until(left) => format!(
                "{}d {:02}h {:02}m {:02}s",
                left.days, left.hours, left.minutes, left.seconds
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn splits_remaining_time() {
        let now = Utc.with_ymd_and_hms(2027, 1, 20, 6, 15, 0).unwrap();
        let start = now + Duration::days(1) + Duration::hours(3) + Duration::minutes(2) + Duration::seconds(5);
        assert_eq!(
            time_until(start, now),
            Countdown::Until(TimeLeft { days: 1, hours: 3, minutes: 2, seconds: 5 })
        );
        assert_eq!(time_until(start, now).display(), "1d 03h 02m 05s");
    }

    #[test]
    fn partial_seconds_round_down() {
        let now = Utc.with_ymd_and_hms(2027, 1, 22, 3, 29, 0).unwrap();
        let start = now + Duration::milliseconds(59_999);
        assert_eq!(
            time_until(start, now),
            Countdown::Until(TimeLeft { days: 0, hours: 0, minutes: 0, seconds: 59 })
        );
    }

    #[test]
    fn reached_start_is_live() {
        let start = Utc.with_ymd_and_hms(2027, 1, 22, 3, 30, 0).unwrap();
        assert!(time_until(start, start).is_live());
        assert!(time_until(start, start + Duration::seconds(1)).is_live());
    }
}
