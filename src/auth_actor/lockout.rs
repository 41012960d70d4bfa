use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct AttemptRecord {
    attempts: u32,
    last_attempt: DateTime<Utc>,
    locked_until: Option<DateTime<Utc>>,
}

impl AttemptRecord {
    fn is_stale(&self, now: DateTime<Utc>, lockout: Duration) -> bool {
        self.last_attempt < now - lockout || self.locked_until.is_some_and(|until| until <= now)
    }
}

/// Counts consecutive failed logins per username and locks the account
/// for a while once the limit is hit.
///
/// A streak is forgotten when no attempt happened for one lockout period,
/// or once the lock itself has run out.
#[derive(Debug)]
pub struct LoginAttempts {
    max_attempts: u32,
    lockout: Duration,
    records: HashMap<String, AttemptRecord>,
}

impl LoginAttempts {
    pub fn new(max_attempts: u32, lockout: Duration) -> Self {
        Self {
            max_attempts,
            lockout,
            records: HashMap::new(),
        }
    }

    pub fn is_locked(&self, username: &str, now: DateTime<Utc>) -> bool {
        self.records
            .get(username)
            .and_then(|record| record.locked_until)
            .is_some_and(|until| until > now)
    }

    /// Records a failed login. Streaks that have gone stale are dropped
    /// first, for every username, so the table only holds live entries.
    pub fn failed(&mut self, username: &str, now: DateTime<Utc>) {
        let lockout = self.lockout;
        self.records.retain(|_, record| !record.is_stale(now, lockout));

        let record = self
            .records
            .entry(username.to_string())
            .or_insert(AttemptRecord {
                attempts: 0,
                last_attempt: now,
                locked_until: None,
            });
        record.attempts += 1;
        record.last_attempt = now;

        if record.attempts >= self.max_attempts && record.locked_until.is_none() {
            record.locked_until = Some(now + lockout);
        }
    }

    pub fn succeeded(&mut self, username: &str) {
        self.records.remove(username);
    }

    pub fn remaining(&self, username: &str) -> u32 {
        let used = self.records.get(username).map_or(0, |record| record.attempts);
        self.max_attempts.saturating_sub(used)
    }
}
