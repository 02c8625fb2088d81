//! chimeramap: base-pair-resolution interaction maps from chimeric alignments
//!
//! This library accumulates chimeric (split) read alignments into dense
//! per-segment-pair count matrices and renders them as contact heatmaps,
//! plus a classification table comparing chimeric calls against known read
//! populations.

pub mod catalog;
pub mod heatmap;
pub mod logging;
pub mod matrix;
pub mod parse;
pub mod table;
pub mod types;

pub use catalog::SegmentCatalog;
pub use matrix::{accumulate_records, InteractionMatrix, MatrixStore, Orientation};
pub use parse::{ChimReader, TrnsReader};
pub use types::*;
