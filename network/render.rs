//! # Graph Rendering
//!
//! Rasterizes an estimated network into an RGBA image: edges first, as
//! anti-alias-free strokes whose width tracks relative absolute weight,
//! then nodes as filled circles with an outline ring. Zero-weight edges are
//! never drawn. Output goes through the `image` crate, so any format it
//! infers from the file extension is supported.

use crate::estimate::NetworkModel;
use image::{Rgba, RgbaImage};
use ndarray::ArrayView2;
use std::path::Path;
use thiserror::Error;

/// Rendering failures.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Image encoding or IO failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("The network has no nodes; nothing to render.")]
    EmptyNetwork,
    #[error("The layout has {coords} coordinate rows for {nodes} nodes.")]
    LayoutMismatch { nodes: usize, coords: usize },
}

/// Visual settings for network rendering.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    /// Frame kept free around the layout, in pixels.
    pub margin: f64,
    pub node_radius: f64,
    /// Stroke width of the strongest edge, in pixels.
    pub max_edge_width: f64,
    /// Stroke width of the weakest visible edge, in pixels.
    pub min_edge_width: f64,
    pub background: Rgba<u8>,
    pub node_fill: Rgba<u8>,
    pub node_outline: Rgba<u8>,
    /// Color of positive-weight edges.
    pub positive_edge: Rgba<u8>,
    /// Color of negative-weight edges.
    pub negative_edge: Rgba<u8>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 800,
            margin: 60.0,
            node_radius: 12.0,
            max_edge_width: 6.0,
            min_edge_width: 1.0,
            background: Rgba([255, 255, 255, 255]),
            node_fill: Rgba([176, 196, 222, 255]),
            node_outline: Rgba([70, 90, 120, 255]),
            positive_edge: Rgba([0, 130, 0, 255]),
            negative_edge: Rgba([190, 30, 30, 255]),
        }
    }
}

/// Draws the network over the given layout into an image buffer.
///
/// `positions` must be the `n x 2` unit-square coordinates produced by
/// [`crate::layout::force_directed`].
pub fn draw_network(
    model: &NetworkModel,
    positions: ArrayView2<'_, f64>,
    config: &RenderConfig,
) -> Result<RgbaImage, RenderError> {
    let p = model.n_nodes();
    if p == 0 {
        return Err(RenderError::EmptyNetwork);
    }
    if positions.nrows() != p {
        return Err(RenderError::LayoutMismatch {
            nodes: p,
            coords: positions.nrows(),
        });
    }

    let mut img = RgbaImage::from_pixel(config.width, config.height, config.background);
    let to_pixel = |i: usize| -> (f64, f64) {
        let x = config.margin + positions[[i, 0]] * (config.width as f64 - 2.0 * config.margin);
        let y = config.margin + positions[[i, 1]] * (config.height as f64 - 2.0 * config.margin);
        (x, y)
    };

    let max_weight = model
        .weights
        .iter()
        .fold(0.0_f64, |m, w| m.max(w.abs()));

    if max_weight > 0.0 {
        for i in 0..p {
            for j in (i + 1)..p {
                let weight = model.weights[[i, j]];
                if weight == 0.0 {
                    continue;
                }
                let relative = weight.abs() / max_weight;
                let stroke = config.min_edge_width
                    + relative * (config.max_edge_width - config.min_edge_width);
                let color = if weight > 0.0 {
                    config.positive_edge
                } else {
                    config.negative_edge
                };
                let (x0, y0) = to_pixel(i);
                let (x1, y1) = to_pixel(j);
                stroke_segment(&mut img, (x0, y0), (x1, y1), stroke * 0.5, color);
            }
        }
    }

    for i in 0..p {
        let (x, y) = to_pixel(i);
        fill_circle(&mut img, (x, y), config.node_radius, config.node_fill);
        ring(&mut img, (x, y), config.node_radius, 1.5, config.node_outline);
    }

    Ok(img)
}

/// Renders the network and writes it to `path`; the format follows the file
/// extension.
pub fn render_to_file(
    model: &NetworkModel,
    positions: ArrayView2<'_, f64>,
    config: &RenderConfig,
    path: &Path,
) -> Result<(), RenderError> {
    let img = draw_network(model, positions, config)?;
    img.save(path)?;
    log::info!(
        "Rendered {} nodes and {} edges to '{}'.",
        model.n_nodes(),
        model.edge_count(),
        path.display()
    );
    Ok(())
}

/// Paints every pixel within `half_width` of the segment.
fn stroke_segment(
    img: &mut RgbaImage,
    (x0, y0): (f64, f64),
    (x1, y1): (f64, f64),
    half_width: f64,
    color: Rgba<u8>,
) {
    let pad = half_width.ceil() + 1.0;
    let min_x = (x0.min(x1) - pad).floor().max(0.0) as u32;
    let max_x = (x0.max(x1) + pad).ceil().min(img.width() as f64 - 1.0) as u32;
    let min_y = (y0.min(y1) - pad).floor().max(0.0) as u32;
    let max_y = (y0.max(y1) + pad).ceil().min(img.height() as f64 - 1.0) as u32;

    let dx = x1 - x0;
    let dy = y1 - y0;
    let length_sq = dx * dx + dy * dy;

    for py in min_y..=max_y {
        for px in min_x..=max_x {
            let fx = px as f64;
            let fy = py as f64;
            let t = if length_sq > 0.0 {
                (((fx - x0) * dx + (fy - y0) * dy) / length_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let cx = x0 + t * dx;
            let cy = y0 + t * dy;
            let dist = ((fx - cx).powi(2) + (fy - cy).powi(2)).sqrt();
            if dist <= half_width {
                img.put_pixel(px, py, color);
            }
        }
    }
}

fn fill_circle(img: &mut RgbaImage, (cx, cy): (f64, f64), radius: f64, color: Rgba<u8>) {
    paint_annulus(img, (cx, cy), 0.0, radius, color);
}

fn ring(img: &mut RgbaImage, (cx, cy): (f64, f64), radius: f64, thickness: f64, color: Rgba<u8>) {
    paint_annulus(img, (cx, cy), radius - thickness, radius + thickness, color);
}

fn paint_annulus(
    img: &mut RgbaImage,
    (cx, cy): (f64, f64),
    inner: f64,
    outer: f64,
    color: Rgba<u8>,
) {
    let min_x = (cx - outer).floor().max(0.0) as u32;
    let max_x = (cx + outer).ceil().min(img.width() as f64 - 1.0) as u32;
    let min_y = (cy - outer).floor().max(0.0) as u32;
    let max_y = (cy + outer).ceil().min(img.height() as f64 - 1.0) as u32;
    for py in min_y..=max_y {
        for px in min_x..=max_x {
            let dist = ((px as f64 - cx).powi(2) + (py as f64 - cy).powi(2)).sqrt();
            if dist >= inner && dist <= outer {
                img.put_pixel(px, py, color);
            }
        }
    }
}
