use super::Ticker;
use crate::aggregation::Snapshot;

/// Collects samples and emits a [`Snapshot`] of them on every tick
#[derive(Debug, Clone, Default)]
pub struct SnapshotTicker;

impl SnapshotTicker {
    pub fn new() -> Self {
        Self
    }
}

impl Ticker for SnapshotTicker {
    type State = Vec<i64>;
    type Item = i64;
    type Output = Snapshot;

    fn name(&self) -> &str {
        "snapshot"
    }

    fn initial(&self) -> Vec<i64> {
        Vec::new()
    }

    fn fold(&self, mut state: Vec<i64>, item: i64) -> Vec<i64> {
        state.push(item);
        state
    }

    fn handle_tick(&self, state: Vec<i64>) -> (Vec<i64>, Snapshot) {
        (Vec::new(), Snapshot::new(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_ticker_sorts_and_clears() {
        let ticker = SnapshotTicker::new();
        let state = [5, 1, 3]
            .into_iter()
            .fold(ticker.initial(), |state, value| ticker.fold(state, value));

        let (state, snapshot) = ticker.handle_tick(state);
        assert_eq!(snapshot.values(), &[1, 3, 5]);
        assert!(state.is_empty());
        assert!(ticker.handle_tick(state).1.is_empty());
    }
}
