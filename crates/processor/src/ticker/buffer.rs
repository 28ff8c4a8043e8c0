use super::Ticker;
use std::marker::PhantomData;

/// Collects items and emits the whole batch on every tick
#[derive(Debug)]
pub struct BufferTicker<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> BufferTicker<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for BufferTicker<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> Ticker for BufferTicker<T> {
    type State = Vec<T>;
    type Item = T;
    type Output = Vec<T>;

    fn name(&self) -> &str {
        "buffer"
    }

    fn initial(&self) -> Vec<T> {
        Vec::new()
    }

    fn fold(&self, mut state: Vec<T>, item: T) -> Vec<T> {
        state.push(item);
        state
    }

    fn handle_tick(&self, state: Vec<T>) -> (Vec<T>, Vec<T>) {
        (Vec::new(), state)
    }
}
