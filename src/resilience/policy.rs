use crate::core::config::ConfigError;
use crate::resilience::classifier::ErrorKind;
use std::collections::BTreeSet;
use std::env;
use std::time::Duration;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(2);
const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_RATE_LIMIT_MULTIPLIER: u32 = 2;

/// Retry configuration, fixed for the lifetime of an adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub retryable_kinds: BTreeSet<ErrorKind>,
    /// Extra backoff factor applied to `RateLimit` failures
    pub rate_limit_multiplier: u32,
    /// Upper bound on a single transport call
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            retryable_kinds: [ErrorKind::Network, ErrorKind::RateLimit, ErrorKind::Unknown]
                .into_iter()
                .collect(),
            rate_limit_multiplier: DEFAULT_RATE_LIMIT_MULTIPLIER,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
            ..Self::default()
        }
    }

    /// A policy that makes exactly one attempt
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            retryable_kinds: BTreeSet::new(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_retryable_kinds<I>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = ErrorKind>,
    {
        self.retryable_kinds = kinds.into_iter().collect();
        self
    }

    #[must_use]
    pub const fn with_rate_limit_multiplier(mut self, multiplier: u32) -> Self {
        self.rate_limit_multiplier = multiplier;
        self
    }

    #[must_use]
    pub const fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Load overrides from `{PREFIX}_RETRY_*` variables, keeping defaults for
    /// anything unset.
    ///
    /// - `{PREFIX}_RETRY_MAX_ATTEMPTS`
    /// - `{PREFIX}_RETRY_BASE_DELAY_MS`
    /// - `{PREFIX}_RETRY_MAX_DELAY_MS`
    /// - `{PREFIX}_RETRY_ATTEMPT_TIMEOUT_MS`
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        let prefix = prefix.to_uppercase();
        let mut policy = Self::default();

        if let Some(v) = read_env_u64(&format!("{}_RETRY_MAX_ATTEMPTS", prefix))? {
            policy.max_attempts = u32::try_from(v).map_err(|_| {
                ConfigError::InvalidEnvironmentValue {
                    name: format!("{}_RETRY_MAX_ATTEMPTS", prefix),
                    value: v.to_string(),
                }
            })?;
        }
        if let Some(ms) = read_env_u64(&format!("{}_RETRY_BASE_DELAY_MS", prefix))? {
            policy.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = read_env_u64(&format!("{}_RETRY_MAX_DELAY_MS", prefix))? {
            policy.max_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = read_env_u64(&format!("{}_RETRY_ATTEMPT_TIMEOUT_MS", prefix))? {
            policy.attempt_timeout = Duration::from_millis(ms);
        }

        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.base_delay > self.max_delay {
            return Err(ConfigError::InvalidConfiguration(format!(
                "base_delay {:?} exceeds max_delay {:?}",
                self.base_delay, self.max_delay
            )));
        }
        if self.attempt_timeout.is_zero() {
            return Err(ConfigError::InvalidConfiguration(
                "attempt_timeout must be non-zero".to_string(),
            ));
        }
        if self.rate_limit_multiplier == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "rate_limit_multiplier must be at least 1".to_string(),
            ));
        }
        // Auth and NotFound always end a call
        if let Some(kind) = self
            .retryable_kinds
            .iter()
            .find(|kind| matches!(kind, ErrorKind::Auth | ErrorKind::NotFound))
        {
            return Err(ConfigError::InvalidConfiguration(format!(
                "{} cannot be retried",
                kind
            )));
        }
        Ok(())
    }

    pub fn is_retryable(&self, kind: ErrorKind) -> bool {
        self.retryable_kinds.contains(&kind)
    }

    /// Delay to wait after failed attempt `attempt` (1-based):
    /// `min(base_delay * 2^(attempt-1) * m, max_delay)` where `m` is the rate
    /// limit multiplier for `RateLimit` and 1 otherwise.
    pub fn backoff_delay(&self, attempt: u32, kind: ErrorKind) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        let multiplier = if kind == ErrorKind::RateLimit {
            self.rate_limit_multiplier
        } else {
            1
        };

        self.base_delay
            .saturating_mul(factor)
            .saturating_mul(multiplier)
            .min(self.max_delay)
    }
}

fn read_env_u64(name: &str) -> Result<Option<u64>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnvironmentValue {
                name: name.to_string(),
                value: raw,
            }),
        Err(_) => Ok(None),
    }
}
