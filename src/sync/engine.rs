/// Sync engine - orchestrates history bootstrap and live polling
///
/// Owns the canonical series for the selected asset and is the only
/// mutator of it. The rendering surface receives owned snapshots; the
/// history fetcher and poller are reached through their trait seams.
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::data::{MergeResult, SeriesStore};
use crate::error::Result;
use crate::feed::{BarCallback, HistoryFetch, LivePoller};
use crate::render::RenderSurface;
use crate::types::Bar;

/// Engine lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// No asset bound
    Idle,
    /// History fetch in flight
    Loading,
    /// History loaded, poller active
    Live,
}

/// Ephemeral binding of one symbol to one generation of sync activity
#[derive(Debug, Clone)]
pub struct SyncSession {
    pub id: Uuid,
    pub symbol: String,
    pub generation: u64,
}

impl SyncSession {
    fn new(symbol: String, generation: u64) -> Self {
        SyncSession {
            id: Uuid::new_v4(),
            symbol,
            generation,
        }
    }
}

struct EngineState {
    phase: SyncPhase,
    /// Bumped on every select/teardown; completions carrying an older
    /// generation are discarded regardless of arrival order
    generation: u64,
    session: Option<SyncSession>,
    store: Option<SeriesStore>,
}

/// Orchestrator binding history fetcher, live poller, series store and
/// rendering surface for one chart
pub struct SyncEngine {
    history: Arc<dyn HistoryFetch>,
    poller: Arc<LivePoller>,
    surface: Arc<dyn RenderSurface>,
    state: Arc<RwLock<EngineState>>,
}

impl SyncEngine {
    pub fn new(
        history: Arc<dyn HistoryFetch>,
        poller: Arc<LivePoller>,
        surface: Arc<dyn RenderSurface>,
    ) -> Self {
        SyncEngine {
            history,
            poller,
            surface,
            state: Arc::new(RwLock::new(EngineState {
                phase: SyncPhase::Idle,
                generation: 0,
                session: None,
                store: None,
            })),
        }
    }

    /// Bind the engine to an asset (host hook: asset changed)
    ///
    /// Supersedes any previous selection immediately: the old poll run is
    /// stopped and an old history fetch that resolves later is discarded
    /// by its generation. On fetch failure the engine returns to `Idle`
    /// and the recoverable error is surfaced; re-selecting retries.
    pub async fn select_asset(&self, symbol: &str) -> Result<()> {
        let (generation, session_id) = {
            let mut state = self.state.write().await;
            state.generation += 1;
            let session = SyncSession::new(symbol.to_string(), state.generation);
            let session_id = session.id;
            state.session = Some(session);
            state.store = Some(SeriesStore::new(symbol.to_string()));
            state.phase = SyncPhase::Loading;
            (state.generation, session_id)
        };

        self.poller.stop_from(generation).await;

        info!(
            "Selected asset {} (session {}, generation {})",
            symbol, session_id, generation
        );

        let result = self.history.fetch_history(symbol).await;

        {
            let mut state = self.state.write().await;
            if state.generation != generation {
                debug!(
                    "Discarding superseded history completion for {} (generation {}, current {})",
                    symbol, generation, state.generation
                );
                return Ok(());
            }

            let bars = match result {
                Ok(bars) => bars,
                Err(e) => {
                    warn!(
                        "History fetch for {} failed: {} ({})",
                        symbol,
                        e,
                        e.error_code()
                    );
                    state.phase = SyncPhase::Idle;
                    state.session = None;
                    state.store = None;
                    return Err(e);
                }
            };

            let Some(store) = state.store.as_mut() else {
                state.phase = SyncPhase::Idle;
                return Ok(());
            };

            store.replace(bars);
            let snapshot = store.snapshot();
            info!("Loaded {} bars for {}", snapshot.len(), symbol);
            self.surface.set_all_bars(snapshot);
            state.phase = SyncPhase::Live;
        }

        // The poll callback only needs the shared state and the surface,
        // not the engine itself
        let state = Arc::clone(&self.state);
        let surface = Arc::clone(&self.surface);
        let on_bar: BarCallback = Arc::new(move |bar: Bar| {
            let state = Arc::clone(&state);
            let surface = Arc::clone(&surface);
            Box::pin(async move {
                Self::merge_live_bar(&state, &surface, generation, bar).await;
            })
        });
        if !self.poller.start(symbol, generation, on_bar, None).await {
            debug!("Poll start for {} superseded before it began", symbol);
        }

        Ok(())
    }

    /// Merge a live bar delivered by the poller into the series
    ///
    /// Ignored unless the engine is still `Live` under the same
    /// generation the poll run was started with.
    async fn merge_live_bar(
        state: &RwLock<EngineState>,
        surface: &Arc<dyn RenderSurface>,
        generation: u64,
        bar: Bar,
    ) {
        let mut state = state.write().await;
        if state.phase != SyncPhase::Live || state.generation != generation {
            debug!(
                "Dropping live bar from superseded run (generation {}, current {})",
                generation, state.generation
            );
            return;
        }

        let Some(store) = state.store.as_mut() else {
            return;
        };

        match store.merge_latest(bar.clone()) {
            MergeResult::Stale => {
                // Out-of-order tick; not an error
            }
            result => {
                debug!(
                    "Merged live bar t={} for {}: {:?}",
                    bar.time,
                    store.symbol(),
                    result
                );
                surface.upsert_bar(bar);
            }
        }
    }

    /// Unbind the engine (host hook: view unmounted). Idempotent.
    pub async fn teardown(&self) {
        let generation = {
            let mut state = self.state.write().await;
            state.generation += 1;
            state.phase = SyncPhase::Idle;
            state.session = None;
            state.store = None;
            state.generation
        };

        self.poller.stop_from(generation).await;
        info!("Sync engine torn down (generation {})", generation);
    }

    /// Host container resized; forwarded to the surface, never triggers
    /// a re-sync
    pub fn resize(&self, width: u32, height: u32) {
        self.surface.resize(width, height);
    }

    pub async fn phase(&self) -> SyncPhase {
        self.state.read().await.phase
    }

    /// Symbol of the currently bound session, if any
    pub async fn active_symbol(&self) -> Option<String> {
        let state = self.state.read().await;
        state.session.as_ref().map(|s| s.symbol.clone())
    }

    /// Ordered copy of the current series (empty when idle)
    pub async fn snapshot(&self) -> Vec<Bar> {
        let state = self.state.read().await;
        state
            .store
            .as_ref()
            .map(|s| s.snapshot())
            .unwrap_or_default()
    }
}
