//! Interaction matrix store and record accumulation
//!
//! One dense count matrix per unordered segment pair, built exhaustively from
//! the catalog before any record is processed. The store owns canonical-key
//! resolution: callers pass segments in record order and receive the stored
//! orientation, so axis transposition and interval swapping always happen
//! together in exactly one place.

use crate::catalog::SegmentCatalog;
use crate::types::{ChimeraMapError, InteractionRecord, Result, SegmentInterval};
use log::{debug, info};
use std::collections::HashMap;
use std::ops::Range;

/// Dense 2-D count matrix with axis lengths fixed at creation
#[derive(Debug, Clone)]
pub struct InteractionMatrix {
    rows: usize,
    cols: usize,
    data: Vec<u32>,
}

impl InteractionMatrix {
    pub fn new(rows: usize, cols: usize) -> Self {
        InteractionMatrix {
            rows,
            cols,
            data: vec![0; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> u32 {
        debug_assert!(row < self.rows && col < self.cols);
        self.data[row * self.cols + col]
    }

    /// Increment every cell in the rectangle `rows x cols` by 1
    pub fn add_block(&mut self, rows: Range<usize>, cols: Range<usize>) {
        debug_assert!(rows.end <= self.rows && cols.end <= self.cols);
        for row in rows {
            let offset = row * self.cols;
            for cell in &mut self.data[offset + cols.start..offset + cols.end] {
                *cell += 1;
            }
        }
    }

    /// Largest cell count in the matrix
    pub fn max(&self) -> u32 {
        self.data.iter().copied().max().unwrap_or(0)
    }

    /// Sum of all cell counts
    pub fn total(&self) -> u64 {
        self.data.iter().map(|&c| c as u64).sum()
    }
}

/// Whether a requested pair matches the stored axis order or is transposed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Forward,
    Swapped,
}

/// Mapping from canonical segment pair to its interaction matrix
#[derive(Debug)]
pub struct MatrixStore {
    index: HashMap<String, usize>,
    names: Vec<String>,
    /// Canonical keys in enumeration order, for deterministic reporting
    pairs: Vec<(usize, usize)>,
    matrices: HashMap<(usize, usize), InteractionMatrix>,
}

impl MatrixStore {
    /// Materialize one matrix per unordered pair of catalog segments,
    /// self-pairs included (a read can chimerically align within one segment)
    pub fn build(catalog: &SegmentCatalog) -> Result<Self> {
        let names: Vec<String> = catalog.ids().to_vec();
        let index: HashMap<String, usize> = names
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        let mut pairs = Vec::new();
        let mut matrices = HashMap::new();
        for i in 0..names.len() {
            let rows = catalog.length(&names[i])?;
            for j in i..names.len() {
                let cols = catalog.length(&names[j])?;
                pairs.push((i, j));
                matrices.insert((i, j), InteractionMatrix::new(rows, cols));
            }
        }

        info!(
            "Built {} interaction matrices for {} segments",
            pairs.len(),
            names.len()
        );
        Ok(MatrixStore {
            index,
            names,
            pairs,
            matrices,
        })
    }

    fn segment_index(&self, id: &str) -> Result<usize> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| ChimeraMapError::UnknownSegment(id.to_string()))
    }

    /// Resolve the stored key and orientation for an unordered segment pair.
    ///
    /// `Forward` means the first requested segment is the row axis of the
    /// stored matrix; `Swapped` means the matrix is stored transposed
    /// relative to the request.
    pub fn resolve(&self, seg1: &str, seg2: &str) -> Result<((usize, usize), Orientation)> {
        let i = self.segment_index(seg1)?;
        let j = self.segment_index(seg2)?;
        if self.matrices.contains_key(&(i, j)) {
            Ok(((i, j), Orientation::Forward))
        } else if self.matrices.contains_key(&(j, i)) {
            Ok(((j, i), Orientation::Swapped))
        } else {
            // Unreachable for an exhaustively built store
            Err(ChimeraMapError::UnknownPair(
                seg1.to_string(),
                seg2.to_string(),
            ))
        }
    }

    /// Stored matrix for an unordered pair, with the orientation of the
    /// request relative to the stored axes
    pub fn get(&self, seg1: &str, seg2: &str) -> Result<(&InteractionMatrix, Orientation)> {
        let (key, orientation) = self.resolve(seg1, seg2)?;
        let matrix = self
            .matrices
            .get(&key)
            .ok_or_else(|| ChimeraMapError::UnknownPair(seg1.to_string(), seg2.to_string()))?;
        Ok((matrix, orientation))
    }

    /// Add 1 to the rectangular block addressed by two (segment, interval)
    /// pairs, transposing the intervals together with the axes when the pair
    /// is stored in the opposite orientation.
    ///
    /// Bounds are checked before any mutation, so a rejected record leaves
    /// every matrix untouched.
    pub fn accumulate(
        &mut self,
        seg1: &str,
        interval1: SegmentInterval,
        seg2: &str,
        interval2: SegmentInterval,
    ) -> Result<()> {
        let (key, orientation) = self.resolve(seg1, seg2)?;
        let (row_iv, col_iv) = match orientation {
            Orientation::Forward => (interval1, interval2),
            Orientation::Swapped => (interval2, interval1),
        };

        let matrix = self
            .matrices
            .get_mut(&key)
            .ok_or_else(|| ChimeraMapError::UnknownPair(seg1.to_string(), seg2.to_string()))?;

        if row_iv.hi > matrix.rows() {
            return Err(ChimeraMapError::OutOfRange {
                segment: self.names[key.0].clone(),
                lo: row_iv.lo,
                hi: row_iv.hi,
                length: matrix.rows(),
            });
        }
        if col_iv.hi > matrix.cols() {
            return Err(ChimeraMapError::OutOfRange {
                segment: self.names[key.1].clone(),
                lo: col_iv.lo,
                hi: col_iv.hi,
                length: matrix.cols(),
            });
        }

        matrix.add_block(row_iv.lo..row_iv.hi, col_iv.lo..col_iv.hi);
        Ok(())
    }

    /// Stored matrices with their segment names, in canonical pair order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &InteractionMatrix)> + '_ {
        self.pairs.iter().map(move |&(i, j)| {
            (
                self.names[i].as_str(),
                self.names[j].as_str(),
                &self.matrices[&(i, j)],
            )
        })
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Drive a record stream into the store, one rectangular block per record.
///
/// Records are applied in their original half order; orientation resolution
/// is entirely the store's concern. Any parse or accumulation error aborts
/// the run.
pub fn accumulate_records<I>(store: &mut MatrixStore, records: I) -> Result<u64>
where
    I: IntoIterator<Item = Result<InteractionRecord>>,
{
    let mut count: u64 = 0;
    for record in records {
        let record = record?;
        debug!(
            "Record: {} {} {} / {} {} {}",
            record.first.segment,
            record.first.strand,
            record.first.interval,
            record.second.segment,
            record.second.strand,
            record.second.interval
        );
        store.accumulate(
            &record.first.segment,
            record.first.interval,
            &record.second.segment,
            record.second.interval,
        )?;
        count += 1;
    }
    info!("Accumulated {} interaction records", count);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{ChimReader, TrnsReader};
    use std::io::Cursor;

    fn test_store() -> MatrixStore {
        let catalog = SegmentCatalog::from_lengths([("chrA", 200), ("chrB", 150)]);
        MatrixStore::build(&catalog).unwrap()
    }

    fn iv(lo: usize, hi: usize) -> SegmentInterval {
        SegmentInterval::new(lo, hi)
    }

    /// Sum of counts in a rectangle, for checking block contents
    fn block_sum(m: &InteractionMatrix, rows: Range<usize>, cols: Range<usize>) -> u64 {
        let mut sum = 0;
        for r in rows {
            for c in cols.clone() {
                sum += m.get(r, c) as u64;
            }
        }
        sum
    }

    #[test]
    fn test_store_is_exhaustive_including_self_pairs() {
        let store = test_store();
        assert_eq!(store.len(), 3); // (A,A), (A,B), (B,B)
        let (m, _) = store.get("chrA", "chrA").unwrap();
        assert_eq!((m.rows(), m.cols()), (200, 200));
        let (m, _) = store.get("chrB", "chrB").unwrap();
        assert_eq!((m.rows(), m.cols()), (150, 150));
    }

    #[test]
    fn test_resolve_orientation() {
        let store = test_store();
        let (_, fwd) = store.get("chrA", "chrB").unwrap();
        let (_, rev) = store.get("chrB", "chrA").unwrap();
        assert_eq!(fwd, Orientation::Forward);
        assert_eq!(rev, Orientation::Swapped);
    }

    #[test]
    fn test_unknown_segment_rejected() {
        let mut store = test_store();
        let err = store
            .accumulate("chrZ", iv(0, 10), "chrB", iv(0, 10))
            .unwrap_err();
        assert!(matches!(err, ChimeraMapError::UnknownSegment(_)));
    }

    #[test]
    fn test_canonical_symmetry() {
        // Accumulating (X,I,Y,J) and (Y,J,X,I) must hit the same cells
        let mut store = test_store();
        store
            .accumulate("chrA", iv(10, 30), "chrB", iv(70, 100))
            .unwrap();
        store
            .accumulate("chrB", iv(70, 100), "chrA", iv(10, 30))
            .unwrap();

        let (m, orientation) = store.get("chrA", "chrB").unwrap();
        assert_eq!(orientation, Orientation::Forward);
        for r in 10..30 {
            for c in 70..100 {
                assert_eq!(m.get(r, c), 2);
            }
        }
        assert_eq!(m.total(), 2 * 20 * 30);
    }

    #[test]
    fn test_additivity_and_disjoint_blocks() {
        let mut store = test_store();
        for _ in 0..3 {
            store
                .accumulate("chrA", iv(0, 5), "chrB", iv(0, 5))
                .unwrap();
        }
        store
            .accumulate("chrA", iv(100, 110), "chrB", iv(50, 60))
            .unwrap();

        let (m, _) = store.get("chrA", "chrB").unwrap();
        assert_eq!(block_sum(m, 0..5, 0..5), 3 * 25);
        assert_eq!(m.get(0, 0), 3);
        assert_eq!(m.get(100, 50), 1);
        // No cross-contamination between the two rectangles
        assert_eq!(m.get(0, 50), 0);
        assert_eq!(m.get(100, 0), 0);
        assert_eq!(m.total(), 3 * 25 + 100);
    }

    #[test]
    fn test_out_of_range_leaves_matrices_unmodified() {
        let mut store = test_store();
        let err = store
            .accumulate("chrA", iv(190, 210), "chrB", iv(0, 10))
            .unwrap_err();
        match err {
            ChimeraMapError::OutOfRange {
                segment,
                hi,
                length,
                ..
            } => {
                assert_eq!(segment, "chrA");
                assert_eq!(hi, 210);
                assert_eq!(length, 200);
            }
            other => panic!("expected OutOfRange, got {:?}", other),
        }
        for (_, _, m) in store.iter() {
            assert_eq!(m.total(), 0);
        }
    }

    #[test]
    fn test_out_of_range_column_checked_before_row_mutation() {
        // Row interval fits, column overflows; nothing may be written
        let mut store = test_store();
        let err = store
            .accumulate("chrA", iv(0, 10), "chrB", iv(140, 160))
            .unwrap_err();
        assert!(matches!(err, ChimeraMapError::OutOfRange { .. }));
        let (m, _) = store.get("chrA", "chrB").unwrap();
        assert_eq!(m.total(), 0);
    }

    #[test]
    fn test_swapped_accumulation_transposes_intervals_with_axes() {
        let mut store = test_store();
        // chrB first: stored key is (chrA, chrB), so the call is Swapped
        store
            .accumulate("chrB", iv(140, 150), "chrA", iv(0, 10))
            .unwrap();
        let (m, _) = store.get("chrA", "chrB").unwrap();
        assert_eq!(m.get(0, 140), 1);
        assert_eq!(m.get(9, 149), 1);
        assert_eq!(m.total(), 100);
    }

    #[test]
    fn test_scenario_trns_record() {
        // mapping01 = (chrA, pos=10, +, len=20), mapping02 = (chrB, pos=100, -, len=30)
        let line = "chrA,10,+,0,20,0,40\tchrB,100,-,20,30,1,35\tread_1";
        let mut store = test_store();
        let n = accumulate_records(&mut store, TrnsReader::new(Cursor::new(line))).unwrap();
        assert_eq!(n, 1);

        let (m, _) = store.get("chrA", "chrB").unwrap();
        for r in 10..30 {
            for c in 70..100 {
                assert_eq!(m.get(r, c), 1);
            }
        }
        assert_eq!(m.total(), 20 * 30);
    }

    #[test]
    fn test_scenario_chim_record_matches_trns_geometry() {
        // Same geometry as the trns scenario, endpoint-encoded
        let line = "chrA\t10\t30\tchrB\t100\t70";
        let mut store = test_store();
        accumulate_records(&mut store, ChimReader::new(Cursor::new(line))).unwrap();

        let (m, _) = store.get("chrA", "chrB").unwrap();
        assert_eq!(block_sum(m, 10..30, 70..100), (20 * 30) as u64);
        assert_eq!(m.total(), 20 * 30);
    }

    #[test]
    fn test_parse_error_aborts_accumulation() {
        let input = "chrA\t10\t30\tchrB\t70\t100\nchrA\t5\t5\tchrB\t1\t2\n";
        let mut store = test_store();
        let err =
            accumulate_records(&mut store, ChimReader::new(Cursor::new(input))).unwrap_err();
        assert!(matches!(err, ChimeraMapError::AmbiguousStrand { .. }));
    }
}
