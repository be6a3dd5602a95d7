//! Consumers of finished sweeps

mod svg_plot;

pub use svg_plot::{SvgPlot, SvgPlotConfig};

use crate::core::types::ScanSession;
use crate::error::Result;

/// Takes ownership of a finished sweep and renders it
pub trait PlotSink {
    fn render(&mut self, session: ScanSession) -> Result<()>;
}
