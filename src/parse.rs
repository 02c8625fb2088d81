//! Parsers for the two chimeric alignment-pair layouts
//!
//! Both readers yield [`InteractionRecord`]s with intervals already
//! normalized to ascending half-open `[lo, hi)` ranges, so no strand logic
//! survives past this module. Malformed lines are errors, never skipped:
//! silently dropping a record would corrupt the resulting counts.

use crate::types::{
    AlignmentHalf, ChimeraMapError, InteractionRecord, Result, SegmentInterval, Strand,
};
use log::info;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

fn malformed(line: usize, message: impl Into<String>) -> ChimeraMapError {
    ChimeraMapError::MalformedRecord {
        line,
        message: message.into(),
    }
}

fn parse_field(value: &str, name: &str, line: usize) -> Result<usize> {
    value
        .parse::<usize>()
        .map_err(|_| malformed(line, format!("invalid {}: {}", name, value)))
}

/// Reader for segemehl `.trns.txt` files (explicit strand + alignment length).
///
/// Each line carries three tab-separated, comma-subdivided groups that
/// concatenate into 14 mapping fields
/// (`chr, pos, strand, start-in-read, align-length, edist, score` per half)
/// followed by the read identifier.
pub struct TrnsReader<R: BufRead> {
    lines: Lines<R>,
    line_number: usize,
}

impl TrnsReader<BufReader<File>> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Reading trns records from {}", path.display());
        let file = File::open(path)?;
        Ok(TrnsReader::new(BufReader::new(file)))
    }
}

impl<R: BufRead> TrnsReader<R> {
    pub fn new(reader: R) -> Self {
        TrnsReader {
            lines: reader.lines(),
            line_number: 0,
        }
    }

    fn parse_line(&self, line: &str) -> Result<InteractionRecord> {
        let groups: Vec<&str> = line.split('\t').collect();
        if groups.len() != 3 {
            return Err(malformed(
                self.line_number,
                format!("expected 3 tab-separated groups, found {}", groups.len()),
            ));
        }

        let fields: Vec<&str> = groups[0]
            .split(',')
            .chain(groups[1].split(','))
            .chain(groups[2].split(','))
            .collect();
        if fields.len() != 15 {
            return Err(malformed(
                self.line_number,
                format!("expected 15 fields, found {}", fields.len()),
            ));
        }

        let first = self.parse_half(&fields[0..7])?;
        let second = self.parse_half(&fields[7..14])?;
        Ok(InteractionRecord { first, second })
    }

    /// One mapping group: `pos` is the 5' anchor regardless of strand, so a
    /// reverse alignment of length L covers `[pos - L, pos)`.
    fn parse_half(&self, fields: &[&str]) -> Result<AlignmentHalf> {
        let segment = fields[0].to_string();
        let pos = parse_field(fields[1], "position", self.line_number)?;
        let strand = match fields[2] {
            "+" => Strand::Forward,
            "-" => Strand::Reverse,
            other => {
                return Err(malformed(
                    self.line_number,
                    format!("invalid strand: {}", other),
                ))
            }
        };
        parse_field(fields[3], "start-in-read", self.line_number)?;
        let length = parse_field(fields[4], "alignment length", self.line_number)?;
        if length == 0 {
            return Err(malformed(self.line_number, "zero alignment length"));
        }
        parse_field(fields[5], "edit distance", self.line_number)?;
        fields[6]
            .parse::<i64>()
            .map_err(|_| malformed(self.line_number, format!("invalid score: {}", fields[6])))?;

        let interval = match strand {
            Strand::Forward => SegmentInterval::new(pos, pos + length),
            Strand::Reverse => {
                let lo = pos.checked_sub(length).ok_or_else(|| {
                    malformed(
                        self.line_number,
                        format!(
                            "reverse alignment of length {} extends below position 0 ({} on {})",
                            length, pos, segment
                        ),
                    )
                })?;
                SegmentInterval::new(lo, pos)
            }
        };

        Ok(AlignmentHalf {
            segment,
            strand,
            interval,
        })
    }
}

impl<R: BufRead> Iterator for TrnsReader<R> {
    type Item = Result<InteractionRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_number += 1;
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            return Some(self.parse_line(&line));
        }
    }
}

/// Reader for bwa-derived chim files (endpoint-based, strand inferred).
///
/// Six tab-separated fields per line: `chr1 start1 end1 chr2 start2 end2`.
/// `start < end` means forward, `start > end` means reverse with the covered
/// range being `[end, start)`; equal endpoints leave the strand undefined and
/// are rejected.
pub struct ChimReader<R: BufRead> {
    lines: Lines<R>,
    line_number: usize,
}

impl ChimReader<BufReader<File>> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Reading chim records from {}", path.display());
        let file = File::open(path)?;
        Ok(ChimReader::new(BufReader::new(file)))
    }
}

impl<R: BufRead> ChimReader<R> {
    pub fn new(reader: R) -> Self {
        ChimReader {
            lines: reader.lines(),
            line_number: 0,
        }
    }

    fn parse_line(&self, line: &str) -> Result<InteractionRecord> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 6 {
            return Err(malformed(
                self.line_number,
                format!("expected 6 fields, found {}", fields.len()),
            ));
        }

        let first = self.parse_half(fields[0], fields[1], fields[2])?;
        let second = self.parse_half(fields[3], fields[4], fields[5])?;
        Ok(InteractionRecord { first, second })
    }

    fn parse_half(&self, chr: &str, start: &str, end: &str) -> Result<AlignmentHalf> {
        let segment = chr.to_string();
        let start = parse_field(start, "start position", self.line_number)?;
        let end = parse_field(end, "end position", self.line_number)?;

        let (strand, interval) = match start.cmp(&end) {
            std::cmp::Ordering::Less => (Strand::Forward, SegmentInterval::new(start, end)),
            std::cmp::Ordering::Greater => (Strand::Reverse, SegmentInterval::new(end, start)),
            std::cmp::Ordering::Equal => {
                return Err(ChimeraMapError::AmbiguousStrand {
                    line: self.line_number,
                    segment,
                    position: start,
                })
            }
        };

        Ok(AlignmentHalf {
            segment,
            strand,
            interval,
        })
    }
}

impl<R: BufRead> Iterator for ChimReader<R> {
    type Item = Result<InteractionRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_number += 1;
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            return Some(self.parse_line(&line));
        }
    }
}
