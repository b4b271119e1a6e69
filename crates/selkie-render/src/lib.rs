#![forbid(unsafe_code)]

//! Plots for [`selkie`] embeddings.
//!
//! The renderer only consumes [`selkie::Placement`]s; it never touches simulation state.

pub mod raster;
pub mod svg;

pub use raster::{RasterOptions, svg_to_png};
pub use svg::{PlotOptions, check_dimensions, render_svg};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("can't plot in {dimensions} dimensions; only 2 or 3 are supported")]
    InvalidDimensionCount { dimensions: usize },
    #[error("`{label}` has {found} coordinates but the plot needs {expected}")]
    PositionDimension {
        label: String,
        expected: usize,
        found: usize,
    },
    #[error("nothing to plot: no visible entities")]
    EmptyPlot,
    #[error("unrecognised background colour `{colour}`")]
    InvalidColour { colour: String },
    #[error("failed to parse SVG")]
    SvgParse,
    #[error("failed to allocate pixmap for raster rendering")]
    PixmapAlloc,
    #[error("failed to encode PNG")]
    PngEncode,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Renders the embedding's current committed layout.
pub fn render_embedding(embedding: &selkie::Embedding, options: &PlotOptions) -> Result<String> {
    render_svg(&embedding.placements(), embedding.dimensions(), options)
}
