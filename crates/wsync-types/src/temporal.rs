use std::cmp::Ordering;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Server-assigned modification time: seconds since the UNIX epoch with
/// two-decimal (10ms) precision.
///
/// Two writes inside the same 10ms window receive equal timestamps; the
/// type does not try to make them distinct.
///
/// Ordering is total (`f64::total_cmp`), so timestamps can be used as sort
/// keys directly.
#[derive(Clone, Copy, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(f64);

impl Timestamp {
    /// The zero timestamp, used for "never modified".
    pub const ZERO: Self = Self(0.0);

    /// Create a timestamp from seconds, rounding to two decimals.
    pub fn from_secs(secs: f64) -> Self {
        Self(round_centis(secs))
    }

    /// Create a timestamp from seconds, rejecting non-finite values.
    pub fn try_from_secs(secs: f64) -> Result<Self, TypeError> {
        if !secs.is_finite() {
            return Err(TypeError::InvalidTimestamp(format!("{secs} is not finite")));
        }
        Ok(Self::from_secs(secs))
    }

    /// The current wall-clock time.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        Self::from_secs(secs)
    }

    /// Seconds since the epoch.
    pub fn as_secs(&self) -> f64 {
        self.0
    }

    /// Returns `true` for the zero timestamp.
    pub fn is_zero(&self) -> bool {
        self.0 == 0.0
    }

    /// A timestamp `secs` seconds later, re-rounded to two decimals.
    pub fn add_secs(&self, secs: f64) -> Self {
        Self::from_secs(self.0 + secs)
    }
}

fn round_centis(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Timestamp {}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl From<Timestamp> for f64 {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({:.2})", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rounds_to_two_decimals() {
        assert_eq!(Timestamp::from_secs(1234.5678).as_secs(), 1234.57);
        assert_eq!(Timestamp::from_secs(1234.5649).as_secs(), 1234.56);
    }

    #[test]
    fn now_produces_reasonable_timestamp() {
        // After 2020-01-01.
        assert!(Timestamp::now().as_secs() > 1_577_836_800.0);
    }

    #[test]
    fn zero_is_smallest_nonnegative() {
        assert!(Timestamp::ZERO.is_zero());
        assert!(Timestamp::ZERO < Timestamp::from_secs(0.01));
    }

    #[test]
    fn non_finite_rejected() {
        assert!(Timestamp::try_from_secs(f64::NAN).is_err());
        assert!(Timestamp::try_from_secs(f64::INFINITY).is_err());
        assert!(Timestamp::try_from_secs(12.0).is_ok());
    }

    #[test]
    fn serializes_as_bare_number() {
        let ts = Timestamp::from_secs(1700000000.25);
        assert_eq!(serde_json::to_string(&ts).unwrap(), "1700000000.25");
        let back: Timestamp = serde_json::from_str("1700000000.25").unwrap();
        assert_eq!(back, ts);
    }

    #[test]
    fn display_format() {
        assert_eq!(Timestamp::from_secs(10.5).to_string(), "10.50");
    }

    proptest! {
        #[test]
        fn rounding_is_idempotent(secs in 0.0f64..4_000_000_000.0) {
            let once = Timestamp::from_secs(secs);
            let twice = Timestamp::from_secs(once.as_secs());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn rounding_preserves_order(a in 0.0f64..4e9, b in 0.0f64..4e9) {
            if a <= b {
                prop_assert!(Timestamp::from_secs(a) <= Timestamp::from_secs(b));
            }
        }
    }
}
