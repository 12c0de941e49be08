use crate::state::AppState;
use marquee_reserve::ExpirationSweeper;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Spawns the background expiration sweeper for the app's store.
pub fn spawn_sweeper(state: &AppState) -> JoinHandle<()> {
    let sweeper = ExpirationSweeper::new(
        state.store.clone(),
        state.clock.clone(),
        Duration::from_millis(state.business_rules.sweep_interval_ms),
    );
    tokio::spawn(sweeper.run())
}
