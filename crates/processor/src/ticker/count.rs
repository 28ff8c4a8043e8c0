use super::Ticker;
use std::marker::PhantomData;

/// Counts items between ticks
#[derive(Debug)]
pub struct CountTicker<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> CountTicker<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for CountTicker<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> Ticker for CountTicker<T> {
    type State = u64;
    type Item = T;
    type Output = u64;

    fn name(&self) -> &str {
        "count"
    }

    fn initial(&self) -> u64 {
        0
    }

    fn fold(&self, state: u64, _item: T) -> u64 {
        state + 1
    }

    fn handle_tick(&self, state: u64) -> (u64, u64) {
        (0, state)
    }
}
