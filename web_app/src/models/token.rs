use chrono::{DateTime, TimeDelta, Utc};

/// Platform access credential. The value is a bearer secret and is never
/// printed.
#[derive(Clone, PartialEq)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// A token is usable while `now` is before `expires_at - safety_margin`.
    pub fn is_fresh(&self, now: DateTime<Utc>, safety_margin: TimeDelta) -> bool {
        self.expires_at
            .checked_sub_signed(safety_margin)
            .is_some_and(|deadline| now < deadline)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
