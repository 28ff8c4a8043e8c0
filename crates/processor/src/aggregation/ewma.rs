use std::time::Duration;
use tokio::time::Instant;

/// Smoothing factor for a sample taken `sample_period` after the previous one
///
/// `alpha = 1 - exp(-sample_period / alpha_period)`
pub fn alpha(sample_period: Duration, alpha_period: Duration) -> f64 {
    let alpha_secs = alpha_period.as_secs_f64();
    if alpha_secs <= 0.0 {
        return 1.0;
    }
    1.0 - (-sample_period.as_secs_f64() / alpha_secs).exp()
}

/// Exponentially weighted moving rate
///
/// Counts are accumulated with [`EwmaState::update`] and folded into the rate
/// on every [`EwmaState::tick`]. The smoothing factor is recomputed from the
/// time that actually elapsed between two ticks, so late ticks are weighted
/// correctly.
///
/// The first tick only records its timestamp and discards whatever was
/// counted before it; the rate keeps its initial value until the second tick.
///
/// # Examples
///
/// ```
/// use processor::aggregation::EwmaState;
/// use std::time::Duration;
/// use tokio::time::Instant;
///
/// let start = Instant::now();
/// let state = EwmaState::new(Duration::from_secs(60))
///     .tick_at(start)
///     .update(50)
///     .tick_at(start + Duration::from_secs(5));
///
/// assert!(state.rate() > 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EwmaState {
    rate: f64,
    uncounted: i64,
    last_tick: Option<Instant>,
    alpha_period: Duration,
}

impl EwmaState {
    pub fn new(alpha_period: Duration) -> Self {
        Self::with_initial_rate(alpha_period, 0.0)
    }

    /// Start from a known per-second rate
    pub fn with_initial_rate(alpha_period: Duration, rate: f64) -> Self {
        Self {
            rate,
            uncounted: 0,
            last_tick: None,
            alpha_period,
        }
    }

    pub fn one_minute() -> Self {
        Self::new(Duration::from_secs(60))
    }

    pub fn five_minutes() -> Self {
        Self::new(Duration::from_secs(5 * 60))
    }

    pub fn fifteen_minutes() -> Self {
        Self::new(Duration::from_secs(15 * 60))
    }

    /// Count `value` events since the last tick
    pub fn update(mut self, value: i64) -> Self {
        self.uncounted = self.uncounted.saturating_add(value);
        self
    }

    /// Fold the uncounted events into the rate using the current time
    pub fn tick(self) -> Self {
        self.tick_at(Instant::now())
    }

    /// Fold the uncounted events into the rate as of `now`
    pub fn tick_at(mut self, now: Instant) -> Self {
        let Some(last_tick) = self.last_tick else {
            self.last_tick = Some(now);
            self.uncounted = 0;
            return self;
        };

        let elapsed = now.saturating_duration_since(last_tick);
        if elapsed.is_zero() {
            return self;
        }

        let instant_rate = self.uncounted as f64 / elapsed.as_secs_f64();
        self.rate += alpha(elapsed, self.alpha_period) * (instant_rate - self.rate);
        self.uncounted = 0;
        self.last_tick = Some(now);
        self
    }

    /// Rate in events per second
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Rate in events per `unit`
    pub fn rate_in_unit(&self, unit: Duration) -> f64 {
        self.rate * unit.as_secs_f64()
    }

    pub fn uncounted(&self) -> i64 {
        self.uncounted
    }

    pub fn last_tick(&self) -> Option<Instant> {
        self.last_tick
    }

    pub fn alpha_period(&self) -> Duration {
        self.alpha_period
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alpha() {
        let a = alpha(Duration::from_secs(5), Duration::from_secs(60));
        assert!((a - (1.0 - (-5.0f64 / 60.0).exp())).abs() < 1e-12);
        assert_eq!(alpha(Duration::ZERO, Duration::from_secs(60)), 0.0);
        assert_eq!(alpha(Duration::from_secs(1), Duration::ZERO), 1.0);
    }

    #[test]
    fn test_update_accumulates_without_tick() {
        let state = EwmaState::one_minute().update(3).update(4);
        assert_eq!(state.uncounted(), 7);
        assert_eq!(state.rate(), 0.0);
        assert!(state.last_tick().is_none());
    }

    #[test]
    fn test_first_tick_is_warm_up() {
        let now = Instant::now();
        let state = EwmaState::one_minute().tick_at(now);
        assert_eq!(state.rate(), 0.0);
        assert_eq!(state.last_tick(), Some(now));

        let state = EwmaState::one_minute().update(100).tick_at(now);
        assert_eq!(state.rate(), 0.0);
        assert_eq!(state.uncounted(), 0);
    }

    #[test]
    fn test_tick_uses_actual_elapsed_time() {
        let start = Instant::now();
        let state = EwmaState::new(Duration::from_secs(60))
            .tick_at(start)
            .update(100)
            .tick_at(start + Duration::from_secs(10));

        let expected = alpha(Duration::from_secs(10), Duration::from_secs(60)) * 10.0;
        assert!((state.rate() - expected).abs() < 1e-9);
        assert_eq!(state.uncounted(), 0);
    }

    #[test]
    fn test_zero_elapsed_tick_keeps_counts() {
        let start = Instant::now();
        let state = EwmaState::one_minute().tick_at(start).update(5).tick_at(start);
        assert_eq!(state.uncounted(), 5);
        assert_eq!(state.rate(), 0.0);
    }

    #[test]
    fn test_converges_monotonically_to_constant_rate() {
        let start = Instant::now();
        let interval = Duration::from_secs(5);
        let mut state = EwmaState::one_minute().tick_at(start);
        let mut previous = state.rate();

        // 20 events per second
        for i in 1..=400u32 {
            state = state.update(100).tick_at(start + interval * i);
            assert!(state.rate() >= previous);
            assert!(state.rate() <= 20.0 + 1e-9);
            previous = state.rate();
        }

        assert!((state.rate() - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_rate_in_unit() {
        let state = EwmaState::with_initial_rate(Duration::from_secs(60), 2.0);
        assert_eq!(state.rate_in_unit(Duration::from_secs(1)), 2.0);
        assert_eq!(state.rate_in_unit(Duration::from_secs(60)), 120.0);
        assert!((state.rate_in_unit(Duration::from_millis(1)) - 0.002).abs() < 1e-12);
    }
}
