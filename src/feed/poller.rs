/// Live bar polling loop
///
/// A cancellable repeating fetch of the current partial bar, bound to a
/// generation counter so a run belonging to a superseded asset selection
/// can neither start late nor keep polling after a newer selection.
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use futures_util::future::BoxFuture;

use crate::error::ChartError;
use crate::feed::client::LatestBarFetch;
use crate::types::Bar;

/// Async callback invoked with each successfully fetched bar
pub type BarCallback = Arc<dyn Fn(Bar) -> BoxFuture<'static, ()> + Send + Sync>;

/// Optional observer for swallowed per-tick fetch failures
pub type PollErrorCallback = Arc<dyn Fn(&ChartError) + Send + Sync>;

/// One spawned polling run
struct ActiveRun {
    generation: u64,
    /// Delivery gate: held across each `on_bar` invocation, so once a
    /// stop has set it no further invocation can occur, including for a
    /// fetch already in flight (the result is discarded, not aborted).
    stop_flag: Arc<Mutex<bool>>,
    /// Wakes the loop out of its timer wait so cancellation is immediate
    stop_tx: watch::Sender<bool>,
}

struct PollerState {
    /// Runs with a generation below this may no longer start
    barrier: u64,
    active: Option<ActiveRun>,
}

/// Repeating latest-bar fetcher with cooperative cancellation
pub struct LivePoller {
    fetcher: Arc<dyn LatestBarFetch>,
    poll_interval: Duration,
    state: Mutex<PollerState>,
}

impl LivePoller {
    pub fn new(fetcher: Arc<dyn LatestBarFetch>, poll_interval: Duration) -> Self {
        LivePoller {
            fetcher,
            poll_interval,
            state: Mutex::new(PollerState {
                barrier: 0,
                active: None,
            }),
        }
    }

    /// Start polling for a symbol under the given generation
    ///
    /// Any previous run is stopped first; at most one interval is ever
    /// active. A start whose generation has already been superseded by
    /// `stop_from` is refused. Returns whether a run was started.
    pub async fn start(
        &self,
        symbol: &str,
        generation: u64,
        on_bar: BarCallback,
        on_error: Option<PollErrorCallback>,
    ) -> bool {
        let mut state = self.state.lock().await;

        if generation < state.barrier {
            debug!(
                "Refusing superseded poll start for {} (generation {} < barrier {})",
                symbol, generation, state.barrier
            );
            return false;
        }

        if let Some(previous) = state.active.take() {
            Self::halt(previous).await;
        }
        state.barrier = generation;

        let stop_flag = Arc::new(Mutex::new(false));
        let (stop_tx, stop_rx) = watch::channel(false);

        let run = PollRun {
            fetcher: Arc::clone(&self.fetcher),
            symbol: symbol.to_string(),
            poll_interval: self.poll_interval,
            stop_flag: Arc::clone(&stop_flag),
            stop_rx,
            on_bar,
            on_error,
        };
        tokio::spawn(run.poll_loop());

        state.active = Some(ActiveRun {
            generation,
            stop_flag,
            stop_tx,
        });

        debug!("Started poll run for {} (generation {})", symbol, generation);
        true
    }

    /// Stop the active run, if any
    ///
    /// After this returns no further `on_bar` invocation occurs.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        if let Some(active) = state.active.take() {
            Self::halt(active).await;
        }
    }

    /// Stop any run older than `generation` and bar older runs from
    /// starting afterwards
    pub async fn stop_from(&self, generation: u64) {
        let mut state = self.state.lock().await;
        if generation <= state.barrier {
            return;
        }
        state.barrier = generation;

        let stale = matches!(&state.active, Some(active) if active.generation < generation);
        if stale {
            if let Some(active) = state.active.take() {
                Self::halt(active).await;
            }
        }
    }

    async fn halt(run: ActiveRun) {
        {
            let mut stopped = run.stop_flag.lock().await;
            *stopped = true;
        }
        // Wake the loop if it is sitting in the timer wait
        let _ = run.stop_tx.send(true);
        debug!("Halted poll run (generation {})", run.generation);
    }
}

struct PollRun {
    fetcher: Arc<dyn LatestBarFetch>,
    symbol: String,
    poll_interval: Duration,
    stop_flag: Arc<Mutex<bool>>,
    stop_rx: watch::Receiver<bool>,
    on_bar: BarCallback,
    on_error: Option<PollErrorCallback>,
}

impl PollRun {
    async fn poll_loop(mut self) {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // `interval` fires immediately; consume the first tick so the
        // first fetch happens one full period after start, matching the
        // host chart's original cadence.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = self.stop_rx.changed() => break,
                _ = ticker.tick() => {}
            }

            if *self.stop_flag.lock().await {
                break;
            }

            match self.fetcher.fetch_latest(&self.symbol).await {
                Ok(bar) => {
                    // Hold the gate across delivery: a stop that lands
                    // during the fetch discards this result.
                    let stopped = self.stop_flag.lock().await;
                    if *stopped {
                        debug!("Discarding in-flight poll result for {}", self.symbol);
                        break;
                    }
                    (self.on_bar)(bar).await;
                }
                Err(e) => {
                    // A single bad cycle self-heals on the next tick
                    warn!(
                        "Poll tick for {} failed: {} ({})",
                        self.symbol,
                        e,
                        e.error_code()
                    );
                    if let Some(on_error) = &self.on_error {
                        on_error(&e);
                    }
                }
            }
        }

        debug!("Poll loop for {} exited", self.symbol);
    }
}
