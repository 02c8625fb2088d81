//! Segment catalog built from a reference FASTA file
//!
//! The catalog fixes the set of segment identifiers and their lengths before
//! any interaction record is read, so matrix shapes are known up front and an
//! out-of-range record can never grow a matrix.

use crate::types::{ChimeraMapError, Result};
use bio::io::fasta;
use log::{debug, info};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Segment identifiers and lengths, in reference file order
#[derive(Debug)]
pub struct SegmentCatalog {
    lengths: HashMap<String, usize>,
    order: Vec<String>,
}

impl SegmentCatalog {
    /// Build a catalog from a FASTA file, taking each record's length
    pub fn from_fasta_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Parsing FASTA file: {}", path.display());

        let file = File::open(path).map_err(|e| {
            ChimeraMapError::FastaParse(format!(
                "Failed to open FASTA file {}: {}",
                path.display(),
                e
            ))
        })?;

        let reader = BufReader::new(file);
        let fasta_reader = fasta::Reader::new(reader);

        let mut catalog = SegmentCatalog {
            lengths: HashMap::new(),
            order: Vec::new(),
        };

        for result in fasta_reader.records() {
            let record = result.map_err(|e| {
                ChimeraMapError::FastaParse(format!("Failed to parse FASTA record: {}", e))
            })?;

            let id = record.id().to_string();
            let length = record.seq().len();

            if catalog.lengths.contains_key(&id) {
                return Err(ChimeraMapError::FastaParse(format!(
                    "Duplicate segment identifier: {}",
                    id
                )));
            }

            debug!("Loaded segment: {} (length: {})", id, length);

            catalog.order.push(id.clone());
            catalog.lengths.insert(id, length);
        }

        if catalog.order.is_empty() {
            return Err(ChimeraMapError::FastaParse(
                "No sequences found in FASTA file".to_string(),
            ));
        }

        info!("Catalog holds {} segments", catalog.order.len());
        Ok(catalog)
    }

    /// Build a catalog directly from (identifier, length) pairs
    pub fn from_lengths<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, usize)>,
        S: Into<String>,
    {
        let mut lengths = HashMap::new();
        let mut order = Vec::new();
        for (id, length) in entries {
            let id = id.into();
            order.push(id.clone());
            lengths.insert(id, length);
        }
        SegmentCatalog { lengths, order }
    }

    /// Length of a segment, failing on unknown identifiers
    pub fn length(&self, id: &str) -> Result<usize> {
        self.lengths
            .get(id)
            .copied()
            .ok_or_else(|| ChimeraMapError::UnknownSegment(id.to_string()))
    }

    /// Segment identifiers in reference file order, each unique
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
