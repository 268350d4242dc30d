/// Rendering surface contract
///
/// The chart itself is an external collaborator; the engine only pushes
/// owned copies through this interface and never hands out references
/// into its own series state.
use tracing::{debug, info};

use crate::types::Bar;

pub trait RenderSurface: Send + Sync {
    /// Full replace of the displayed series (history load)
    fn set_all_bars(&self, bars: Vec<Bar>);

    /// Insert-or-update of the most recent bar (live tick)
    fn upsert_bar(&self, bar: Bar);

    /// Host container resized; redraw only, never re-synchronize
    fn resize(&self, width: u32, height: u32);
}

/// Surface that renders updates as log lines, used by the demo binary
pub struct LogSurface;

impl RenderSurface for LogSurface {
    fn set_all_bars(&self, bars: Vec<Bar>) {
        match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => info!(
                "Chart loaded: {} bars, {} .. {}",
                bars.len(),
                first.timestamp().format("%Y-%m-%d"),
                last.timestamp().format("%Y-%m-%d")
            ),
            _ => info!("Chart loaded: 0 bars"),
        }
    }

    fn upsert_bar(&self, bar: Bar) {
        info!(
            "Chart tick: {} O={:.2} H={:.2} L={:.2} C={:.2} V={:.2}",
            bar.timestamp().format("%H:%M:%S"),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume
        );
    }

    fn resize(&self, width: u32, height: u32) {
        debug!("Chart resized to {}x{}", width, height);
    }
}
