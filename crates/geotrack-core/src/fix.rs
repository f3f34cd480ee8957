use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single timestamped reading from the location provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl LocationFix {
    /// Build a fix stamped with the current time.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp: Utc::now(),
        }
    }

    /// `(0.0, 0.0)` denotes "never recorded", never a real position.
    pub fn is_sentinel(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_exact_double_zero() {
        assert!(LocationFix::new(0.0, 0.0).is_sentinel());
        assert!(!LocationFix::new(0.0, 20.0).is_sentinel());
        assert!(!LocationFix::new(10.0, 0.0).is_sentinel());
        assert!(!LocationFix::new(10.0, 20.0).is_sentinel());
    }
}
