use super::Ticker;
use crate::aggregation::EwmaState;
use std::time::Duration;

/// Turns event counts into an exponentially weighted rate
///
/// Items are counts added to the current interval; every tick advances the
/// EWMA and emits the rate expressed per `unit`.
#[derive(Debug, Clone)]
pub struct EwmaTicker {
    alpha_period: Duration,
    unit: Duration,
}

impl EwmaTicker {
    pub fn new(alpha_period: Duration, unit: Duration) -> Self {
        Self { alpha_period, unit }
    }

    /// Events per second smoothed over one minute
    pub fn per_second() -> Self {
        Self::new(Duration::from_secs(60), Duration::from_secs(1))
    }
}

impl Ticker for EwmaTicker {
    type State = EwmaState;
    type Item = i64;
    type Output = f64;

    fn name(&self) -> &str {
        "ewma"
    }

    fn initial(&self) -> EwmaState {
        EwmaState::new(self.alpha_period)
    }

    fn fold(&self, state: EwmaState, item: i64) -> EwmaState {
        state.update(item)
    }

    fn handle_tick(&self, state: EwmaState) -> (EwmaState, f64) {
        let state = state.tick();
        (state, state.rate_in_unit(self.unit))
    }
}
