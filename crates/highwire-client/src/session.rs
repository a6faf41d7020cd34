//! Login session cache
//!
//! One `Session` lives inside each `HighwireClient`, behind a mutex, and is
//! shared by every reconcile that uses that client.

use chrono::{DateTime, Duration, Utc};

/// Tokens closer than this many minutes to expiry are refreshed before use.
pub const TOKEN_SAFETY_BUFFER_MINUTES: i64 = 10;

/// Cached `apiToken` and its expiry.
#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Token usable at `now`, i.e. not expiring within the safety buffer.
    pub fn valid_token(&self, now: DateTime<Utc>) -> Option<&str> {
        match (&self.token, self.expires_at) {
            (Some(token), Some(expires_at))
                if now
                    .checked_add_signed(Duration::minutes(TOKEN_SAFETY_BUFFER_MINUTES))
                    .is_some_and(|deadline| deadline < expires_at) =>
            {
                Some(token.as_str())
            }
            _ => None,
        }
    }

    /// Record a fresh login. Without a lifetime the token is considered
    /// expired immediately, so the next call logs in again.
    ///
    /// Lifetimes too large to represent are capped at the latest
    /// representable instant.
    pub fn store(&mut self, token: String, expires_in_secs: Option<f64>, now: DateTime<Utc>) {
        // Sub-second precision is irrelevant for a 10 minute buffer.
        // Float to int casts saturate, and NaN becomes 0.
        let expires_at = match expires_in_secs {
            Some(secs) => Duration::try_seconds(secs.max(0.0) as i64)
                .and_then(|lifetime| now.checked_add_signed(lifetime))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            None => now,
        };
        self.token = Some(token);
        self.expires_at = Some(expires_at);
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn clear(&mut self) {
        self.token = None;
        self.expires_at = None;
    }
}
