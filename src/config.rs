// src/config.rs
use std::ops::RangeInclusive;

use tracing_subscriber::EnvFilter;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_TITLE: &str = "CSV Data Visualizer";

pub const WINDOW_SIZE: (u32, u32) = (1200, 900);

/// Rows shown in the raw data preview.
pub const PREVIEW_ROWS: usize = 5;

pub const BIN_RANGE: RangeInclusive<u32> = 5..=50;
pub const DEFAULT_BINS: u32 = 20;

pub const CHART_HEIGHT: f32 = 460.0;
pub const CELL_WIDTH: f32 = 120.0;
pub const INDEX_WIDTH: f32 = 50.0;

const DEFAULT_LOG_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn,iced_wgpu=warn";

/// Installs the global tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    if let Err(err) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
    {
        tracing::debug!(error = %err, "tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bins_sit_inside_the_slider_range() {
        assert!(BIN_RANGE.contains(&DEFAULT_BINS));
        assert_eq!(*BIN_RANGE.start(), 5);
        assert_eq!(*BIN_RANGE.end(), 50);
    }

    #[test]
    fn logging_can_be_initialised_twice() {
        init_logging();
        init_logging();
    }
}
