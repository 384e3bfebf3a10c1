//! Monotonic progress reporting
//!
//! Every progress stream in the engine (download, extraction, overall sync)
//! only ever reports a value that is strictly greater than the previous one.

/// Passes a value through only when it exceeds everything reported so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressGate {
    reported: u8,
}

impl ProgressGate {
    /// Gate that has already reported `floor`
    ///
    /// Values at or below `floor` are swallowed.
    pub fn starting_at(floor: u8) -> Self {
        Self { reported: floor }
    }

    /// Offer a value, returning it if it is a new maximum
    pub fn advance(&mut self, value: u8) -> Option<u8> {
        if value > self.reported {
            self.reported = value;
            Some(value)
        } else {
            None
        }
    }

    /// Highest value reported so far
    pub fn reported(&self) -> u8 {
        self.reported
    }
}

/// `floor(scale * done / total)`, clamped to `scale`
///
/// Returns `None` when `total` is zero.
pub fn scaled(scale: u8, done: u64, total: u64) -> Option<u8> {
    if total == 0 {
        return None;
    }
    let value = (u128::from(scale) * u128::from(done.min(total))) / u128::from(total);
    Some(value as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_only_passes_increases() {
        let mut gate = ProgressGate::default();
        let emitted: Vec<u8> = [0, 3, 3, 2, 10, 50, 50]
            .into_iter()
            .filter_map(|v| gate.advance(v))
            .collect();
        assert_eq!(emitted, [3, 10, 50]);
        assert_eq!(gate.reported(), 50);
    }

    #[test]
    fn test_gate_floor() {
        let mut gate = ProgressGate::starting_at(50);
        assert_eq!(gate.advance(50), None);
        assert_eq!(gate.advance(51), Some(51));
    }

    #[test]
    fn test_scaled() {
        assert_eq!(scaled(50, 0, 1000), Some(0));
        assert_eq!(scaled(50, 999, 1000), Some(49));
        assert_eq!(scaled(50, 1000, 1000), Some(50));
        assert_eq!(scaled(50, 2000, 1000), Some(50));
        assert_eq!(scaled(50, u64::MAX, u64::MAX), Some(50));
        assert_eq!(scaled(50, 10, 0), None);
    }
}
