//! Classification table for chimeric mapping calls
//!
//! Compares the chimeric calls of a mapping run against the known read
//! populations of a benchmark: reads simulated from interactions should be
//! called chimeric, reads simulated from the plain genome should not.
//! Produces a Markdown table of true/false positives and negatives plus
//! unmapped counts per population.

use crate::types::{ChimeraMapError, Result};
use bio::io::fastq;
use log::{debug, info, warn};
use rust_htslib::bam::record::Aux;
use rust_htslib::{bam, bam::Read};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// YZ aux-tag value marking a read as chimeric
const CHIMERIC_FLAG: i64 = 8;

/// Read identifiers from a FASTQ file, in file order
pub fn read_fastq_ids<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let reader = fastq::Reader::from_file(path).map_err(|e| {
        ChimeraMapError::FastqParse(format!(
            "Failed to open FASTQ file {}: {}",
            path.display(),
            e
        ))
    })?;

    let mut ids = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| {
            ChimeraMapError::FastqParse(format!("Failed to parse FASTQ record: {}", e))
        })?;
        ids.push(record.id().to_string());
    }

    debug!("Read {} ids from {}", ids.len(), path.display());
    Ok(ids)
}

/// Identifiers of reads that produced a chimeric alignment (first tab field
/// of each chim line)
pub fn chim_read_ids<P: AsRef<Path>>(path: P) -> Result<HashSet<String>> {
    let file = File::open(path.as_ref())?;
    let mut ids = HashSet::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let id = line.split('\t').next().unwrap_or("").to_string();
        ids.insert(id);
    }
    debug!("Read {} chimeric ids", ids.len());
    Ok(ids)
}

/// Identifiers of unmapped reads in a BAM file
pub fn unmapped_read_ids<P: AsRef<Path>>(bam_path: P) -> Result<HashSet<String>> {
    let bam_path = bam_path.as_ref();
    let mut reader = bam::Reader::from_path(bam_path).map_err(|e| {
        ChimeraMapError::BamParse(format!(
            "Failed to open BAM file {}: {}",
            bam_path.display(),
            e
        ))
    })?;

    let mut unmapped = HashSet::new();
    for result in reader.records() {
        let record = result
            .map_err(|e| ChimeraMapError::BamParse(format!("Failed to read BAM record: {}", e)))?;
        if record.is_unmapped() {
            unmapped.insert(String::from_utf8_lossy(record.qname()).into_owned());
        }
    }

    debug!("Found {} unmapped reads", unmapped.len());
    Ok(unmapped)
}

/// Per-read value of the YZ aux tag, for mappers that flag chimeric calls
/// in-band
pub fn yz_flag_values<P: AsRef<Path>>(bam_path: P) -> Result<HashMap<String, i64>> {
    let bam_path = bam_path.as_ref();
    let mut reader = bam::Reader::from_path(bam_path).map_err(|e| {
        ChimeraMapError::BamParse(format!(
            "Failed to open BAM file {}: {}",
            bam_path.display(),
            e
        ))
    })?;

    let mut flags = HashMap::new();
    for result in reader.records() {
        let record = result
            .map_err(|e| ChimeraMapError::BamParse(format!("Failed to read BAM record: {}", e)))?;
        let value = match record.aux(b"YZ") {
            Ok(Aux::String(s)) => match s.trim().parse::<i64>() {
                Ok(v) => v,
                Err(_) => {
                    return Err(ChimeraMapError::BamParse(format!(
                        "Non-numeric YZ tag value: {}",
                        s
                    )))
                }
            },
            Ok(Aux::I8(v)) => v as i64,
            Ok(Aux::U8(v)) => v as i64,
            Ok(Aux::I16(v)) => v as i64,
            Ok(Aux::U16(v)) => v as i64,
            Ok(Aux::I32(v)) => v as i64,
            Ok(Aux::U32(v)) => v as i64,
            Ok(other) => {
                return Err(ChimeraMapError::BamParse(format!(
                    "Unexpected YZ tag type: {:?}",
                    other
                )))
            }
            // Reads without the tag were simply not flagged by the mapper
            Err(rust_htslib::errors::Error::BamAuxTagNotFound) => continue,
            Err(e) => {
                return Err(ChimeraMapError::BamParse(format!(
                    "Failed to read YZ tag: {}",
                    e
                )))
            }
        };
        flags.insert(String::from_utf8_lossy(record.qname()).into_owned(), value);
    }

    debug!("Collected YZ flags for {} reads", flags.len());
    Ok(flags)
}

/// 2x3 classification counts; a `None` cell was not computable from the
/// available inputs and renders as "not computed"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationCounts {
    pub true_positive: Option<u64>,
    pub false_positive: Option<u64>,
    pub true_negative: Option<u64>,
    pub false_negative: Option<u64>,
    pub unmapped_interaction: Option<u64>,
    pub unmapped_genome: Option<u64>,
}

impl ClassificationCounts {
    fn zero() -> Self {
        ClassificationCounts {
            true_positive: Some(0),
            false_positive: Some(0),
            true_negative: Some(0),
            false_negative: Some(0),
            unmapped_interaction: Some(0),
            unmapped_genome: Some(0),
        }
    }

    /// All cells missing, for inputs the statistic cannot be derived from
    pub fn not_computed() -> Self {
        ClassificationCounts {
            true_positive: None,
            false_positive: None,
            true_negative: None,
            false_negative: None,
            unmapped_interaction: None,
            unmapped_genome: None,
        }
    }

    /// Grand total across all six cells, including both unmapped counts
    pub fn total(&self) -> Option<u64> {
        Some(
            self.true_positive?
                + self.false_positive?
                + self.true_negative?
                + self.false_negative?
                + self.unmapped_interaction?
                + self.unmapped_genome?,
        )
    }
}

fn bump(slot: &mut Option<u64>) {
    if let Some(v) = slot.as_mut() {
        *v += 1;
    }
}

/// Classify reads by the YZ flag their mapper attached (segemehl pipeline).
///
/// Reads absent from the flag map were never aligned. If the BAM carried no
/// YZ tags at all the statistic is not computable and every cell is left
/// unfilled rather than silently counted as unmapped.
pub fn classify_with_flags(
    genome_ids: &[String],
    interaction_ids: &[String],
    flags: &HashMap<String, i64>,
) -> ClassificationCounts {
    if flags.is_empty() {
        warn!("BAM file carries no YZ tags; classification table not computed");
        return ClassificationCounts::not_computed();
    }

    let mut counts = ClassificationCounts::zero();
    for id in genome_ids {
        match flags.get(id) {
            None => bump(&mut counts.unmapped_genome),
            Some(&flag) if flag == CHIMERIC_FLAG => bump(&mut counts.false_positive),
            Some(_) => bump(&mut counts.true_negative),
        }
    }
    for id in interaction_ids {
        match flags.get(id) {
            None => bump(&mut counts.unmapped_interaction),
            Some(&flag) if flag == CHIMERIC_FLAG => bump(&mut counts.true_positive),
            Some(_) => bump(&mut counts.false_negative),
        }
    }

    info!(
        "Classified {} reads by YZ flag",
        counts.total().unwrap_or(0)
    );
    counts
}

/// Classify reads by membership in the chimeric-ID set (bwa pipeline).
///
/// A mapped interaction read without a chimeric call is a false negative.
pub fn classify_with_chim_ids(
    genome_ids: &[String],
    interaction_ids: &[String],
    chim_ids: &HashSet<String>,
    unmapped: &HashSet<String>,
) -> ClassificationCounts {
    let mut counts = ClassificationCounts::zero();
    for id in genome_ids {
        if unmapped.contains(id) {
            bump(&mut counts.unmapped_genome);
        } else if chim_ids.contains(id) {
            bump(&mut counts.false_positive);
        } else {
            bump(&mut counts.true_negative);
        }
    }
    for id in interaction_ids {
        if unmapped.contains(id) {
            bump(&mut counts.unmapped_interaction);
        } else if chim_ids.contains(id) {
            bump(&mut counts.true_positive);
        } else {
            bump(&mut counts.false_negative);
        }
    }

    info!(
        "Classified {} reads by chimeric-ID set",
        counts.total().unwrap_or(0)
    );
    counts
}

fn cell(count: Option<u64>) -> String {
    match count {
        Some(v) => v.to_string(),
        None => "not computed".to_string(),
    }
}

/// Write the classification counts as a Markdown table
pub fn write_markdown_table<W: Write>(counts: &ClassificationCounts, writer: &mut W) -> Result<()> {
    writeln!(writer, "| | interaction | genome |")?;
    writeln!(writer, "|----------------------|-------------|---------|")?;
    writeln!(
        writer,
        "| chimeric mapping | {} | {} |",
        cell(counts.true_positive),
        cell(counts.false_positive)
    )?;
    writeln!(
        writer,
        "| non-chimeric mapping | {} | {} |",
        cell(counts.false_negative),
        cell(counts.true_negative)
    )?;
    writeln!(
        writer,
        "| unmapped | {} | {} |",
        cell(counts.unmapped_interaction),
        cell(counts.unmapped_genome)
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as IoWrite;
    use tempfile::NamedTempFile;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_read_fastq_ids() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "@read_1 simulated").unwrap();
        writeln!(temp_file, "ACGT").unwrap();
        writeln!(temp_file, "+").unwrap();
        writeln!(temp_file, "IIII").unwrap();
        writeln!(temp_file, "@read_2").unwrap();
        writeln!(temp_file, "TTTT").unwrap();
        writeln!(temp_file, "+").unwrap();
        writeln!(temp_file, "IIII").unwrap();

        let ids = read_fastq_ids(temp_file.path()).unwrap();
        assert_eq!(ids, vec!["read_1".to_string(), "read_2".to_string()]);
    }

    #[test]
    fn test_chim_read_ids() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "read_1\tchrA\t10\t30").unwrap();
        writeln!(temp_file, "read_2\tchrB\t70\t100").unwrap();
        writeln!(temp_file, "read_1\tchrA\t40\t60").unwrap();

        let ids = chim_read_ids(temp_file.path()).unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("read_1"));
        assert!(ids.contains("read_2"));
    }

    #[test]
    fn test_yz_flag_values_skips_untagged_reads() {
        use rust_htslib::bam::{self, header::HeaderRecord, Format, Header, Record};

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("reads.bam");

        let mut header = Header::new();
        let mut sq = HeaderRecord::new(b"SQ");
        sq.push_tag(b"SN", &"chrA");
        sq.push_tag(b"LN", &200);
        header.push_record(&sq);

        {
            let mut writer = bam::Writer::from_path(&path, &header, Format::Bam).unwrap();

            let mut tagged = Record::new();
            tagged.set(b"read_1", None, b"ACGT", b"IIII");
            tagged.set_tid(0);
            tagged.set_pos(10);
            tagged.push_aux(b"YZ", Aux::String("8")).unwrap();
            writer.write(&tagged).unwrap();

            let mut untagged = Record::new();
            untagged.set(b"read_2", None, b"ACGT", b"IIII");
            untagged.set_tid(0);
            untagged.set_pos(20);
            writer.write(&untagged).unwrap();
        }

        let flags = yz_flag_values(&path).unwrap();
        assert_eq!(flags.get("read_1"), Some(&8));
        assert!(!flags.contains_key("read_2"));
    }

    #[test]
    fn test_classify_with_flags() {
        let genome_ids = ids(&["g1", "g2", "g3"]);
        let interaction_ids = ids(&["i1", "i2", "i3"]);
        let mut flags = HashMap::new();
        flags.insert("g1".to_string(), 0); // true negative
        flags.insert("g2".to_string(), 8); // false positive
        flags.insert("i1".to_string(), 8); // true positive
        flags.insert("i2".to_string(), 0); // false negative
        // g3 and i3 unmapped

        let counts = classify_with_flags(&genome_ids, &interaction_ids, &flags);
        assert_eq!(counts.true_negative, Some(1));
        assert_eq!(counts.false_positive, Some(1));
        assert_eq!(counts.true_positive, Some(1));
        assert_eq!(counts.false_negative, Some(1));
        assert_eq!(counts.unmapped_genome, Some(1));
        assert_eq!(counts.unmapped_interaction, Some(1));
        assert_eq!(counts.total(), Some(6));
    }

    #[test]
    fn test_classify_with_flags_missing_tags() {
        let counts = classify_with_flags(&ids(&["g1"]), &ids(&["i1"]), &HashMap::new());
        assert_eq!(counts, ClassificationCounts::not_computed());
        assert_eq!(counts.total(), None);
    }

    #[test]
    fn test_classify_with_chim_ids() {
        let genome_ids = ids(&["g1", "g2", "g3"]);
        let interaction_ids = ids(&["i1", "i2", "i3"]);
        let chim_ids: HashSet<String> = ["g2", "i1"].iter().map(|s| s.to_string()).collect();
        let unmapped: HashSet<String> = ["g3", "i3"].iter().map(|s| s.to_string()).collect();

        let counts = classify_with_chim_ids(&genome_ids, &interaction_ids, &chim_ids, &unmapped);
        assert_eq!(counts.true_negative, Some(1)); // g1: mapped, not chimeric
        assert_eq!(counts.false_positive, Some(1)); // g2: chimeric call
        assert_eq!(counts.true_positive, Some(1)); // i1: chimeric call
        assert_eq!(counts.false_negative, Some(1)); // i2: mapped, not chimeric
        assert_eq!(counts.unmapped_genome, Some(1));
        assert_eq!(counts.unmapped_interaction, Some(1));
    }

    #[test]
    fn test_markdown_table_layout() {
        let mut counts = ClassificationCounts::zero();
        counts.true_positive = Some(10);
        counts.false_negative = Some(2);
        let mut out = Vec::new();
        write_markdown_table(&counts, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("| | interaction | genome |\n"));
        assert!(text.contains("| chimeric mapping | 10 | 0 |"));
        assert!(text.contains("| non-chimeric mapping | 2 | 0 |"));
        assert!(text.contains("| unmapped | 0 | 0 |"));
    }

    #[test]
    fn test_markdown_table_not_computed() {
        let counts = ClassificationCounts::not_computed();
        let mut out = Vec::new();
        write_markdown_table(&counts, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("| chimeric mapping | not computed | not computed |"));
    }
}
