use std::time::Duration;

use chrono::NaiveTime;

/// Default daily run time, UTC.
pub const DEFAULT_REMINDER_AT: &str = "08:30";

/// Delay before the single run of `--test` mode.
pub const DEFAULT_TEST_DELAY: Duration = Duration::from_secs(30);

/// Notifier configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Time of day (UTC) of the daily reminder run.
    pub reminder_at: NaiveTime,
    /// Wait before `--test` mode reminds every open loan.
    pub test_delay: Duration,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            reminder_at: NaiveTime::from_hms_opt(8, 30, 0).unwrap_or(NaiveTime::MIN),
            test_delay: DEFAULT_TEST_DELAY,
        }
    }
}

impl NotifierConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var         | Default |
    /// |-----------------|---------|
    /// | `REMINDER_AT`   | `08:30` |
    /// | `TEST_DELAY_MS` | `30000` |
    pub fn from_env() -> Self {
        let reminder_at = parse_reminder_at(
            &std::env::var("REMINDER_AT").unwrap_or_else(|_| DEFAULT_REMINDER_AT.to_string()),
        )
        .expect("REMINDER_AT must be a time of day formatted as HH:MM");

        let test_delay_ms: u64 = std::env::var("TEST_DELAY_MS")
            .unwrap_or_else(|_| DEFAULT_TEST_DELAY.as_millis().to_string())
            .parse()
            .expect("TEST_DELAY_MS must be a valid u64");

        Self {
            reminder_at,
            test_delay: Duration::from_millis(test_delay_ms),
        }
    }
}

/// Parse an `HH:MM` time of day.
pub fn parse_reminder_at(raw: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hours_and_minutes() {
        assert_eq!(
            parse_reminder_at(" 07:05 ").unwrap(),
            NaiveTime::from_hms_opt(7, 5, 0).unwrap()
        );
    }

    #[test]
    fn rejects_out_of_range_time() {
        assert!(parse_reminder_at("25:00").is_err());
        assert!(parse_reminder_at("morning").is_err());
    }

    #[test]
    fn default_matches_documented_time() {
        assert_eq!(
            NotifierConfig::default().reminder_at,
            parse_reminder_at(DEFAULT_REMINDER_AT).unwrap()
        );
    }
}
