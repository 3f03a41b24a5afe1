/// Interpolation curve applied between `from` and `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    #[default]
    Linear,
    In,
    Out,
    Both,
}

impl Easing {
    fn apply(self, t: f32) -> f32 {
        match self {
            Self::Linear => t,
            Self::In => ease_in(t),
            Self::Out => ease_out(t),
            Self::Both => ease_both(t),
        }
    }
}

fn ease_in(t: f32) -> f32 {
    t * t
}

fn ease_out(t: f32) -> f32 {
    t * (2.0 - t)
}

fn ease_both(t: f32) -> f32 {
    if t < 0.5 {
        return ease_in(t * 2.0) * 0.5;
    }
    0.5 + ease_out((t - 0.5) * 2.0) * 0.5
}

const UNCHANGED_EPSILON: f32 = 0.00001;

/// Scalar eased over a time window.
///
/// All operations take the current time in milliseconds so the owner decides
/// which clock drives the animation (frame time, a manual clock in tests).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimatedScalar {
    from: f32,
    to: f32,
    when: u64,
    due: u64,
    easing: Easing,
    softer: bool,
}

impl AnimatedScalar {
    pub fn new(value: f32, now: u64) -> Self {
        Self {
            from: value,
            to: value,
            when: now,
            due: now,
            easing: Easing::Linear,
            softer: false,
        }
    }

    /// Jumps to `value` with no transition and clears the easing mode.
    pub fn init(&mut self, value: f32, now: u64) {
        *self = Self::new(value, now);
    }

    pub fn set_easing(&mut self, easing: Easing, softer: bool) {
        self.easing = easing;
        self.softer = softer;
    }

    pub fn easing(&self) -> Easing {
        self.easing
    }

    /// Destination value, regardless of progress.
    pub fn target(&self) -> f32 {
        self.to
    }

    pub fn is_finished(&self, now: u64) -> bool {
        self.from == self.to || now >= self.due
    }

    /// Normalized progress through the window; 1 once the window is empty.
    pub fn pos(&self, now: u64) -> f32 {
        if self.due <= self.when {
            return 1.0;
        }
        (now.saturating_sub(self.when)) as f32 / (self.due - self.when) as f32
    }

    pub fn value_at(&self, now: u64) -> f32 {
        if now >= self.due {
            return self.to;
        }
        if now <= self.when {
            return self.from;
        }
        let mut t = self.easing.apply(self.pos(now));
        if self.softer {
            t = self.easing.apply(t);
        }
        self.from * (1.0 - t) + self.to * t
    }

    /// Starts a transition from the current value; a zero span is instant.
    pub fn set_value(&mut self, to: f32, span_ms: u64, now: u64) {
        if span_ms == 0 {
            self.from = to;
            self.to = to;
            self.when = now;
            self.due = now;
        } else if (to - self.to).abs() > UNCHANGED_EPSILON {
            self.from = self.value_at(now);
            self.to = to;
            self.when = now;
            self.due = now.saturating_add(span_ms);
        }
    }

    /// Like `set_value`, but eases both ends when starting from rest and only
    /// the tail when retargeting a running transition.
    pub fn set_value_eased(&mut self, to: f32, span_ms: u64, now: u64) {
        if (to - self.to).abs() <= UNCHANGED_EPSILON {
            self.to = to;
            return;
        }
        if self.is_finished(now) {
            self.from = self.to;
            self.easing = Easing::Both;
        } else {
            self.from = self.value_at(now);
            self.easing = Easing::Out;
        }
        self.softer = false;
        self.to = to;
        self.when = now;
        self.due = now.saturating_add(span_ms);
    }

    /// Freezes at the current value.
    pub fn stop(&mut self, now: u64) {
        let value = self.value_at(now);
        self.from = value;
        self.to = value;
        self.when = now;
        self.due = now;
    }
}

#[cfg(test)]
mod tests {
    use super::AnimatedScalar;
    use super::Easing;
    use proptest::prelude::*;

    #[test]
    fn value_holds_endpoints_outside_window() {
        let mut anim = AnimatedScalar::new(0.0, 1_000);
        anim.set_value(100.0, 200, 1_000);
        assert_eq!(anim.value_at(900), 0.0);
        assert_eq!(anim.value_at(1_000), 0.0);
        assert_eq!(anim.value_at(1_200), 100.0);
        assert_eq!(anim.value_at(5_000), 100.0);
        assert!((anim.value_at(1_100) - 50.0).abs() < 0.001);
    }

    #[test]
    fn zero_span_is_instant() {
        let mut anim = AnimatedScalar::new(10.0, 0);
        anim.set_value(40.0, 0, 50);
        assert_eq!(anim.value_at(50), 40.0);
        assert!(anim.is_finished(50));
    }

    #[test]
    fn eased_from_rest_uses_both_curve() {
        let mut anim = AnimatedScalar::new(0.0, 0);
        anim.set_value_eased(100.0, 100, 0);
        assert_eq!(anim.easing(), Easing::Both);
        // ease-both at the quarter point: ease_in(0.5) * 0.5
        assert!((anim.value_at(25) - 12.5).abs() < 0.001);
        assert!((anim.value_at(50) - 50.0).abs() < 0.001);
    }

    #[test]
    fn eased_retarget_continues_from_current_value() {
        let mut anim = AnimatedScalar::new(0.0, 0);
        anim.set_value_eased(100.0, 100, 0);
        let midway = anim.value_at(50);
        anim.set_value_eased(200.0, 100, 50);
        assert_eq!(anim.easing(), Easing::Out);
        assert!((anim.value_at(50) - midway).abs() < 0.001);
        assert_eq!(anim.value_at(150), 200.0);
    }

    #[test]
    fn eased_ignores_negligible_change() {
        let mut anim = AnimatedScalar::new(5.0, 0);
        anim.set_value_eased(5.000_001, 600, 0);
        assert!(anim.is_finished(0));
    }

    #[test]
    fn softer_applies_curve_twice() {
        let mut anim = AnimatedScalar::new(0.0, 0);
        anim.set_value(1.0, 100, 0);
        anim.set_easing(Easing::In, true);
        // (0.5^2)^2
        assert!((anim.value_at(50) - 0.0625).abs() < 0.0001);
    }

    #[test]
    fn stop_freezes_current_value() {
        let mut anim = AnimatedScalar::new(0.0, 0);
        anim.set_value(100.0, 100, 0);
        anim.stop(50);
        assert!(anim.is_finished(50));
        assert!((anim.value_at(1_000) - 50.0).abs() < 0.001);
        assert!((anim.target() - 50.0).abs() < 0.001);
    }

    proptest! {
        #[test]
        fn value_stays_between_endpoints(
            from in -5_000.0f32..5_000.0,
            to in -5_000.0f32..5_000.0,
            span in 1u64..2_000,
            at in 0u64..3_000,
        ) {
            let mut anim = AnimatedScalar::new(from, 0);
            anim.set_value_eased(to, span, 0);
            let value = anim.value_at(at);
            let low = from.min(to) - 0.01;
            let high = from.max(to) + 0.01;
            prop_assert!(value >= low && value <= high);
        }
    }
}
