use serde::{Deserialize, Serialize};

/// Running average that weights the newest sample by `1 / window`.
///
/// `avg = (avg * (window - 1) + sample) / window`, starting from the stored value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollingAverage {
    window: u32,
    value: f64,
}

impl RollingAverage {
    #[must_use]
    pub fn new(window: u32) -> Self {
        Self::with_value(window, 0.0)
    }

    #[must_use]
    pub fn with_value(window: u32, value: f64) -> Self {
        Self {
            window: window.max(1),
            value,
        }
    }

    pub fn update(&mut self, sample: f64) -> f64 {
        let window = f64::from(self.window);
        self.value = (self.value * (window - 1.0) + sample) / window;
        self.value
    }

    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    #[must_use]
    pub fn window(&self) -> u32 {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_moves_toward_sample() {
        let mut avg = RollingAverage::new(50);
        assert!((avg.update(50.0) - 1.0).abs() < 1e-12);
        assert!((avg.update(50.0) - (49.0 + 50.0) / 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_window_of_one_tracks_last_sample() {
        let mut avg = RollingAverage::new(1);
        avg.update(3.0);
        assert!((avg.update(7.0) - 7.0).abs() < f64::EPSILON);
    }
}
