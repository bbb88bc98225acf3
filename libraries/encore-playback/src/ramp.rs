//! Linear volume ramps
//!
//! Play and pause never jump the player volume. A ramp moves it from the
//! current level to the target in a fixed number of discrete steps, which
//! avoids the click of an instant amplitude change.

/// Ramp direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeDirection {
    In,
    Out,
}

/// Linear ramp between two volume levels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeRamp {
    from: f32,
    to: f32,
    steps: u32,
}

impl VolumeRamp {
    /// Create a ramp; levels are clamped to 0.0-1.0 and `steps` to at least 1
    pub fn new(from: f32, to: f32, steps: u32) -> Self {
        Self {
            from: clamp_level(from),
            to: clamp_level(to),
            steps: steps.max(1),
        }
    }

    pub fn from(&self) -> f32 {
        self.from
    }

    pub fn to(&self) -> f32 {
        self.to
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn direction(&self) -> FadeDirection {
        if self.to < self.from {
            FadeDirection::Out
        } else {
            FadeDirection::In
        }
    }

    /// Level after `step` steps; the last step lands exactly on the target
    pub fn level_at(&self, step: u32) -> f32 {
        if step >= self.steps {
            return self.to;
        }
        let t = step as f32 / self.steps as f32;
        clamp_level(self.from + (self.to - self.from) * t)
    }

    pub fn is_last(&self, step: u32) -> bool {
        step >= self.steps
    }
}

fn clamp_level(level: f32) -> f32 {
    if level.is_finite() {
        level.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fade_in_reaches_target_in_ten_steps() {
        let ramp = VolumeRamp::new(0.0, 1.0, 10);
        assert_eq!(ramp.direction(), FadeDirection::In);
        assert!((ramp.level_at(1) - 0.1).abs() < 1e-6);
        assert!((ramp.level_at(5) - 0.5).abs() < 1e-6);
        assert_eq!(ramp.level_at(10), 1.0);
        assert!(ramp.is_last(10));
        assert!(!ramp.is_last(9));
    }

    #[test]
    fn fade_out_from_partial_volume() {
        let ramp = VolumeRamp::new(0.4, 0.0, 10);
        assert_eq!(ramp.direction(), FadeDirection::Out);
        assert!((ramp.level_at(5) - 0.2).abs() < 1e-6);
        assert_eq!(ramp.level_at(10), 0.0);
    }

    #[test]
    fn levels_are_monotonic() {
        let ramp = VolumeRamp::new(0.9, 0.0, 10);
        let levels: Vec<f32> = (0..=10).map(|s| ramp.level_at(s)).collect();
        assert!(levels.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn clamps_out_of_range_and_nan() {
        let ramp = VolumeRamp::new(f32::NAN, 3.0, 0);
        assert_eq!(ramp.from(), 0.0);
        assert_eq!(ramp.to(), 1.0);
        assert_eq!(ramp.steps(), 1);
        assert_eq!(ramp.level_at(1), 1.0);
    }
}
