//! SVG rendering of a sweep
//!
//! Projects each valid sample to Cartesian coordinates around the sensor and
//! draws range rings, axes, the outline through all hits and a marker per hit.
//! Missing samples are left out of the drawing but counted in the caption.

use super::PlotSink;
use crate::core::types::ScanSession;
use crate::error::Result;
use std::path::PathBuf;
use svg::node::element::{Circle, Line, Polyline, Rectangle, Text};
use svg::Document;

mod colors {
    pub const BACKGROUND: &str = "#FFFFFF";
    pub const RING: &str = "#DDDDDD";
    pub const AXIS: &str = "#999999";
    pub const OUTLINE: &str = "#2222AA";
    pub const POINT: &str = "#AA2222";
    pub const SENSOR: &str = "#22AA22";
    pub const TEXT: &str = "#333333";
}

/// Rendering parameters
#[derive(Debug, Clone)]
pub struct SvgPlotConfig {
    /// Pixels per centimeter
    pub scale: f32,
    /// Distance between range rings (cm)
    pub ring_spacing: f32,
    /// Padding around the outermost ring (px)
    pub padding: f32,
    /// Sample marker radius (px)
    pub point_radius: f32,
    pub title: String,
}

impl Default for SvgPlotConfig {
    fn default() -> Self {
        Self {
            scale: 2.0,
            ring_spacing: 50.0,
            padding: 40.0,
            point_radius: 3.0,
            title: "2D Object Mapping".to_string(),
        }
    }
}

/// Writes each rendered sweep to an SVG file
pub struct SvgPlot {
    path: PathBuf,
    config: SvgPlotConfig,
}

impl SvgPlot {
    pub fn new(path: impl Into<PathBuf>, config: SvgPlotConfig) -> Self {
        Self {
            path: path.into(),
            config,
        }
    }

    fn document(&self, session: &ScanSession) -> Document {
        let cfg = &self.config;
        let points: Vec<(f32, f32)> = session.points().collect();

        let max_range = points
            .iter()
            .map(|(x, y)| x.hypot(*y))
            .fold(cfg.ring_spacing, f32::max);
        let rings = (max_range / cfg.ring_spacing).ceil().max(1.0) as u32;
        let radius_px = rings as f32 * cfg.ring_spacing * cfg.scale;

        let size = 2.0 * (radius_px + cfg.padding);
        let center = size / 2.0;
        // SVG y grows downward
        let to_px = |x: f32, y: f32| (center + x * cfg.scale, center - y * cfg.scale);

        let mut doc = Document::new()
            .set("width", size)
            .set("height", size)
            .set("viewBox", (0.0, 0.0, size, size))
            .add(
                Rectangle::new()
                    .set("width", size)
                    .set("height", size)
                    .set("fill", colors::BACKGROUND),
            );

        for ring in 1..=rings {
            let r_cm = ring as f32 * cfg.ring_spacing;
            doc = doc
                .add(
                    Circle::new()
                        .set("cx", center)
                        .set("cy", center)
                        .set("r", r_cm * cfg.scale)
                        .set("fill", "none")
                        .set("stroke", colors::RING)
                        .set("stroke-width", 1),
                )
                .add(
                    Text::new(format!("{} cm", r_cm))
                        .set("x", center + 4.0)
                        .set("y", center - r_cm * cfg.scale - 2.0)
                        .set("font-size", 10)
                        .set("font-family", "sans-serif")
                        .set("fill", colors::AXIS),
                );
        }

        for (x1, y1, x2, y2) in [
            (center - radius_px, center, center + radius_px, center),
            (center, center - radius_px, center, center + radius_px),
        ] {
            doc = doc.add(
                Line::new()
                    .set("x1", x1)
                    .set("y1", y1)
                    .set("x2", x2)
                    .set("y2", y2)
                    .set("stroke", colors::AXIS)
                    .set("stroke-width", 1),
            );
        }

        if points.len() > 1 {
            let outline = points
                .iter()
                .map(|&(x, y)| {
                    let (px, py) = to_px(x, y);
                    format!("{:.1},{:.1}", px, py)
                })
                .collect::<Vec<_>>()
                .join(" ");
            doc = doc.add(
                Polyline::new()
                    .set("points", outline)
                    .set("fill", "none")
                    .set("stroke", colors::OUTLINE)
                    .set("stroke-width", 1.5),
            );
        }

        for &(x, y) in &points {
            let (px, py) = to_px(x, y);
            doc = doc.add(
                Circle::new()
                    .set("cx", px)
                    .set("cy", py)
                    .set("r", cfg.point_radius)
                    .set("fill", colors::POINT),
            );
        }

        doc.add(
            Circle::new()
                .set("cx", center)
                .set("cy", center)
                .set("r", cfg.point_radius + 1.0)
                .set("fill", colors::SENSOR),
        )
        .add(
            Text::new(cfg.title.clone())
                .set("x", 10)
                .set("y", 20)
                .set("font-size", 14)
                .set("font-family", "sans-serif")
                .set("fill", colors::TEXT),
        )
        .add(
            Text::new(format!(
                "{} samples @ {}°, {} missing",
                session.len(),
                session.step_angle,
                session.missing_count()
            ))
            .set("x", 10)
            .set("y", size - 10.0)
            .set("font-size", 11)
            .set("font-family", "monospace")
            .set("fill", colors::TEXT),
        )
    }
}

impl PlotSink for SvgPlot {
    fn render(&mut self, session: ScanSession) -> Result<()> {
        let doc = self.document(&session);
        svg::save(&self.path, &doc)?;
        log::info!(
            "Plot written to {} ({} points)",
            self.path.display(),
            session.valid_count()
        );
        Ok(())
    }
}
