//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Example
//!
//! ```toml
//! [retry]
//! max_attempts = 10
//! retry_delay = "10s"
//! backoff = "exponential"
//! max_delay = "2m"
//! wait_for_lock = false
//!
//! [identity]
//! name = "CI Pool Resource"
//! email = "ci-pool@localhost"
//! ```
//!
//! # Validation
//!
//! Values are validated after parsing: durations must parse, attempts must
//! be at least one, backoff must be a known strategy.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Known backoff strategy names.
pub const BACKOFF_STRATEGIES: [&str; 2] = ["fixed", "exponential"];

/// Global configuration (user scope).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Claim/release retry settings
    pub retry: Option<RetryConfig>,

    /// Commit identity used for claim and release commits
    pub identity: Option<IdentityConfig>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(retry) = &self.retry {
            retry.validate()?;
        }
        if let Some(identity) = &self.identity {
            identity.validate()?;
        }
        Ok(())
    }
}

/// Retry settings for the claim/release loop.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Total publish attempts before giving up
    pub max_attempts: Option<u32>,

    /// Delay between attempts (e.g. "10s", "500ms")
    pub retry_delay: Option<String>,

    /// "fixed" or "exponential"
    pub backoff: Option<String>,

    /// Upper bound for exponential backoff
    pub max_delay: Option<String>,

    /// Keep retrying while the pool is empty
    pub wait_for_lock: Option<bool>,
}

impl RetryConfig {
    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == Some(0) {
            return Err(ConfigError::InvalidValue(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if let Some(delay) = &self.retry_delay {
            parse_duration(delay)?;
        }
        if let Some(delay) = &self.max_delay {
            parse_duration(delay)?;
        }
        if let Some(backoff) = &self.backoff {
            if !BACKOFF_STRATEGIES.contains(&backoff.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid backoff '{}', must be one of: {}",
                    backoff,
                    BACKOFF_STRATEGIES.join(", ")
                )));
            }
        }
        Ok(())
    }
}

/// Commit author/committer identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct IdentityConfig {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl IdentityConfig {
    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ConfigError::InvalidValue(
                "identity.name cannot be empty".to_string(),
            ));
        }
        if self.email.as_deref().is_some_and(|e| e.trim().is_empty()) {
            return Err(ConfigError::InvalidValue(
                "identity.email cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse a duration written as `<n>ms`, `<n>s`, `<n>m` or `<n>h`.
///
/// A bare number is read as seconds.
///
/// # Example
///
/// ```
/// use lockpool::core::config::schema::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
/// assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
/// assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
/// assert!(parse_duration("soon").is_err());
/// ```
pub fn parse_duration(input: &str) -> Result<Duration, ConfigError> {
    let text = input.trim();
    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, unit) = text.split_at(split);

    let value: u64 = digits
        .parse()
        .map_err(|_| ConfigError::InvalidValue(format!("invalid duration '{input}'")))?;

    let duration = match unit.trim() {
        "ms" => Duration::from_millis(value),
        "" | "s" => Duration::from_secs(value),
        "m" => Duration::from_secs(value.saturating_mul(60)),
        "h" => Duration::from_secs(value.saturating_mul(3600)),
        other => {
            return Err(ConfigError::InvalidValue(format!(
                "invalid duration unit '{other}' in '{input}'"
            )))
        }
    };
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let config: GlobalConfig = toml::from_str(
            r#"
            [retry]
            max_attempts = 3
            retry_delay = "500ms"
            backoff = "exponential"
            max_delay = "5s"
            wait_for_lock = true

            [identity]
            name = "Pool Bot"
            email = "bot@example.com"
            "#,
        )
        .unwrap();

        config.validate().unwrap();
        let retry = config.retry.unwrap();
        assert_eq!(retry.max_attempts, Some(3));
        assert_eq!(retry.wait_for_lock, Some(true));
        assert_eq!(config.identity.unwrap().name.as_deref(), Some("Pool Bot"));
    }

    #[test]
    fn zero_attempts_rejected() {
        let retry = RetryConfig {
            max_attempts: Some(0),
            ..Default::default()
        };
        assert!(retry.validate().is_err());
    }

    #[test]
    fn unknown_backoff_rejected() {
        let retry = RetryConfig {
            backoff: Some("random".to_string()),
            ..Default::default()
        };
        let err = retry.validate().unwrap_err();
        assert!(err.to_string().contains("fixed, exponential"));
    }

    #[test]
    fn empty_identity_rejected() {
        let identity = IdentityConfig {
            name: Some("  ".to_string()),
            email: None,
        };
        assert!(identity.validate().is_err());
    }

    mod durations {
        use super::*;

        #[test]
        fn bare_number_is_seconds() {
            assert_eq!(parse_duration("30").unwrap(), Duration::from_secs(30));
        }

        #[test]
        fn hours() {
            assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        }

        #[test]
        fn rejects_negative_and_empty() {
            assert!(parse_duration("-1s").is_err());
            assert!(parse_duration("").is_err());
            assert!(parse_duration("10 days").is_err());
        }
    }
}
