#![forbid(unsafe_code)]

//! Force-directed multidimensional scaling.
//!
//! Pairwise similarities become target distances; each entity is a point mass tied to its
//! partners by springs, and the system is relaxed step by step until the layout's distances
//! approximate the targets. A multi-start search picks a good random seed before the long run.
//!
//! ```no_run
//! use selkie::{Embedding, EmbeddingOptions, SearchOptions};
//!
//! let mut embedding = Embedding::load("pairs.txt", "wind", EmbeddingOptions::default())?;
//! selkie::optimize(&mut embedding, &SearchOptions::default())?;
//! embedding.normalize_orientation()?;
//! print!("{embedding}");
//! # Ok::<(), selkie::Error>(())
//! ```

pub mod coords;
pub mod embedding;
pub mod entity;
pub mod error;
pub mod field;
pub mod ingest;
pub mod options;
mod rng;
pub mod search;

pub use coords::Coords;
pub use embedding::{COINCIDENT_DISTANCE, Embedding, Placement, friction};
pub use entity::Entity;
pub use error::{Error, Result};
pub use field::SimilarityField;
pub use ingest::{ParsedRecords, SimilarityBounds, SimilarityRecord, parse_records};
pub use options::{EmbeddingOptions, SearchOptions, SelkieConfig, SimilarityTransform};
pub use search::{
    SearchOutcome, SearchReport, find_best_starting_positions, optimize, relax, relax_with,
};
