//! Core data structures for chimeric interaction mapping

use clap::ValueEnum;
use thiserror::Error;

/// Errors that can occur while building interaction maps
#[derive(Error, Debug)]
pub enum ChimeraMapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("FASTA parsing error: {0}")]
    FastaParse(String),

    #[error("malformed record at line {line}: {message}")]
    MalformedRecord { line: usize, message: String },

    #[error("ambiguous strand at line {line}: start == end == {position} on {segment}")]
    AmbiguousStrand {
        line: usize,
        segment: String,
        position: usize,
    },

    #[error("unknown segment: {0}")]
    UnknownSegment(String),

    #[error("no matrix stored for segment pair ({0}, {1})")]
    UnknownPair(String, String),

    #[error("interval [{lo}, {hi}) out of range for segment {segment} (length {length})")]
    OutOfRange {
        segment: String,
        lo: usize,
        hi: usize,
        length: usize,
    },

    #[error("FASTQ parsing error: {0}")]
    FastqParse(String),

    #[error("BAM parsing error: {0}")]
    BamParse(String),

    #[error("plotting error: {0}")]
    Plot(String),
}

pub type Result<T> = std::result::Result<T, ChimeraMapError>;

/// DNA strand orientation of one sub-alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    Forward,
    Reverse,
}

impl std::fmt::Display for Strand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strand::Forward => write!(f, "+"),
            Strand::Reverse => write!(f, "-"),
        }
    }
}

/// Half-open coordinate interval `[lo, hi)` on a segment.
///
/// Parsers only ever emit ascending intervals with `hi > lo`, regardless of
/// the strand the alignment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentInterval {
    pub lo: usize,
    pub hi: usize,
}

impl SegmentInterval {
    pub fn new(lo: usize, hi: usize) -> Self {
        debug_assert!(hi > lo, "interval must be ascending and non-empty");
        SegmentInterval { lo, hi }
    }

    pub fn len(&self) -> usize {
        self.hi - self.lo
    }
}

impl std::fmt::Display for SegmentInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.lo, self.hi)
    }
}

/// One genomic sub-alignment of a chimeric read
#[derive(Debug, Clone)]
pub struct AlignmentHalf {
    pub segment: String,
    pub strand: Strand,
    pub interval: SegmentInterval,
}

/// Both halves of one chimeric read, in input order
#[derive(Debug, Clone)]
pub struct InteractionRecord {
    pub first: AlignmentHalf,
    pub second: AlignmentHalf,
}

/// Input layout of the alignment-pair source
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    /// segemehl .trns.txt: explicit strand plus alignment length per half
    Trns,
    /// bwa-derived chim file: start/end endpoints per half, strand inferred
    Chim,
}

impl std::fmt::Display for InputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputFormat::Trns => write!(f, "trns"),
            InputFormat::Chim => write!(f, "chim"),
        }
    }
}
