//! Time-boxed one-time codes for transfer confirmation.
//!
//! RFC 6238 style TOTP over HMAC-SHA1, keyed by the user's email. Codes are
//! valid for the current time step plus `window` adjacent steps; single use
//! is enforced one level up by persisting the last accepted step per user.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Validates short-lived one-time codes bound to a user identity.
#[derive(Clone, Debug)]
pub struct ChallengeVerifier {
    step_secs: u64,
    digits: u32,
    window: i64,
}

impl Default for ChallengeVerifier {
    fn default() -> Self {
        Self {
            step_secs: 120,
            digits: 6,
            window: 1,
        }
    }
}

impl ChallengeVerifier {
    pub fn new(step_secs: u64, digits: u32, window: i64) -> Self {
        Self {
            step_secs,
            digits,
            window,
        }
    }

    /// The time step `now` falls into.
    pub fn step_at(&self, now: DateTime<Utc>) -> i64 {
        now.timestamp().div_euclid(self.step_secs as i64)
    }

    /// Generates the code for `identity` at `now`.
    pub fn generate(&self, identity: &str, now: DateTime<Utc>) -> String {
        self.code_at(identity, self.step_at(now))
    }

    /// Checks `submitted` against the current and adjacent time steps.
    ///
    /// Returns the matched step so callers can persist it and refuse a
    /// second use of the same code.
    pub fn verify(&self, identity: &str, submitted: &str, now: DateTime<Utc>) -> Option<i64> {
        let current = self.step_at(now);
        for delta in -self.window..=self.window {
            let step = current + delta;
            if step >= 0 && self.code_at(identity, step) == submitted {
                return Some(step);
            }
        }
        None
    }

    fn code_at(&self, identity: &str, step: i64) -> String {
        #[allow(clippy::expect_used)]
        let mut mac = HmacSha1::new_from_slice(identity.as_bytes())
            .expect("hmac accepts keys of any length");
        mac.update(&step.to_be_bytes());
        let digest = mac.finalize().into_bytes();

        // RFC 4226 dynamic truncation.
        let offset = (digest[digest.len() - 1] & 0x0f) as usize;
        let binary = (u32::from(digest[offset] & 0x7f) << 24)
            | (u32::from(digest[offset + 1]) << 16)
            | (u32::from(digest[offset + 2]) << 8)
            | u32::from(digest[offset + 3]);

        let code = binary % 10u32.pow(self.digits);
        format!("{code:0width$}", width = self.digits as usize)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn code_is_stable_within_a_step() {
        let verifier = ChallengeVerifier::default();
        assert_eq!(
            verifier.generate("alice@example.com", at(1_000_000)),
            verifier.generate("alice@example.com", at(1_000_119))
        );
    }

    #[test]
    fn code_changes_across_steps_and_identities() {
        let verifier = ChallengeVerifier::default();
        let now = at(1_000_000);
        assert_ne!(
            verifier.generate("alice@example.com", now),
            verifier.generate("alice@example.com", at(1_000_000 + 240))
        );
        assert_ne!(
            verifier.generate("alice@example.com", now),
            verifier.generate("bob@example.com", now)
        );
    }

    #[test]
    fn verify_accepts_adjacent_step() {
        let verifier = ChallengeVerifier::default();
        let issued = at(1_000_000);
        let code = verifier.generate("alice@example.com", issued);

        // Still valid one step later, rejected two steps later.
        assert!(
            verifier
                .verify("alice@example.com", &code, at(1_000_000 + 120))
                .is_some()
        );
        assert!(
            verifier
                .verify("alice@example.com", &code, at(1_000_000 + 360))
                .is_none()
        );
    }

    #[test]
    fn verify_rejects_wrong_code() {
        let verifier = ChallengeVerifier::default();
        assert!(
            verifier
                .verify("alice@example.com", "000000", at(1_000_000))
                .is_none()
                || verifier.generate("alice@example.com", at(1_000_000)) == "000000"
        );
    }
}
