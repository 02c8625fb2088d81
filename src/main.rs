use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use log::info;
use std::io::Write;
use std::path::{Path, PathBuf};

use chimeramap::{
    accumulate_records, heatmap,
    logging::init_logger,
    parse::{ChimReader, TrnsReader},
    table, InputFormat, MatrixStore, SegmentCatalog,
};

/// chimeramap: interaction heatmaps from chimeric read alignments
#[derive(Parser)]
#[command(name = "chimeramap")]
#[command(about = "Build base-pair-resolution interaction maps from chimeric read alignments")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (shows debug info)
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,

    /// Log file path (optional, receives all messages)
    #[arg(long = "log-file", value_name = "FILE", global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Accumulate alignment pairs into per-segment-pair matrices and render heatmaps
    Heatmap(HeatmapArgs),
    /// Derive a chimeric-mapping classification table from benchmark read sets
    Table(TableArgs),
}

#[derive(Args)]
struct HeatmapArgs {
    /// Reference FASTA file defining segments and matrix dimensions
    #[arg(short = 'f', long = "fasta", value_name = "FILE")]
    fasta_file: PathBuf,

    /// Alignment-pair input file (trns or chim layout)
    #[arg(short = 'i', long = "input", value_name = "FILE")]
    input_file: PathBuf,

    /// Output directory for heatmap PNGs
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    output_dir: PathBuf,

    /// Input layout of the alignment-pair file
    #[arg(short = 'F', long = "format", value_enum)]
    format: InputFormat,

    /// Number of threads for parallel rendering (default: number of CPU cores)
    #[arg(short = 't', long = "threads", value_name = "N")]
    threads: Option<usize>,
}

#[derive(Args)]
struct TableArgs {
    /// FASTQ file with the interaction (chimeric) read population
    #[arg(short = 'i', long = "interactions", value_name = "FILE")]
    interactions_fastq: PathBuf,

    /// FASTQ file with the genomic (non-chimeric) read population
    #[arg(short = 'g', long = "genome", value_name = "FILE")]
    genome_fastq: PathBuf,

    /// Mapped reads in BAM format
    #[arg(short = 'b', long = "bam", value_name = "FILE")]
    bam_file: PathBuf,

    /// Chim file from bwa-mem mappings; when given, classification uses its
    /// read-ID set instead of YZ flags
    #[arg(short = 'c', long = "chim", value_name = "FILE")]
    chim_file: Option<PathBuf>,

    /// Output Markdown file (default: stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logger(cli.verbose, cli.log_file.as_deref())?;
    info!("Starting chimeramap v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Heatmap(args) => run_heatmap(&args),
        Commands::Table(args) => run_table(&args),
    }
}

fn require_file(path: &Path, label: &str) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("{} does not exist: {}", label, path.display());
    }
    Ok(())
}

fn run_heatmap(args: &HeatmapArgs) -> Result<()> {
    require_file(&args.fasta_file, "FASTA file")?;
    require_file(&args.input_file, "Input file")?;

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .map_err(|e| anyhow::anyhow!("Failed to set thread pool: {}", e))?;
        info!("Using {} threads", threads);
    }

    info!("Input format: {}", args.format);

    let catalog = SegmentCatalog::from_fasta_file(&args.fasta_file)?;
    let mut store = MatrixStore::build(&catalog)?;

    let record_count = match args.format {
        InputFormat::Trns => {
            accumulate_records(&mut store, TrnsReader::from_path(&args.input_file)?)?
        }
        InputFormat::Chim => {
            accumulate_records(&mut store, ChimReader::from_path(&args.input_file)?)?
        }
    };
    info!(
        "Processed {} records across {} segment pairs",
        record_count,
        store.len()
    );

    heatmap::render_all(&store, &args.output_dir)?;
    info!("Heatmaps written to {}", args.output_dir.display());

    Ok(())
}

fn run_table(args: &TableArgs) -> Result<()> {
    require_file(&args.interactions_fastq, "Interactions FASTQ file")?;
    require_file(&args.genome_fastq, "Genome FASTQ file")?;
    require_file(&args.bam_file, "BAM file")?;
    if let Some(chim_file) = &args.chim_file {
        require_file(chim_file, "Chim file")?;
    }

    let interaction_ids = table::read_fastq_ids(&args.interactions_fastq)?;
    let genome_ids = table::read_fastq_ids(&args.genome_fastq)?;
    info!(
        "Read {} interaction and {} genome read ids",
        interaction_ids.len(),
        genome_ids.len()
    );

    let counts = match &args.chim_file {
        Some(chim_file) => {
            let chim_ids = table::chim_read_ids(chim_file)?;
            let unmapped = table::unmapped_read_ids(&args.bam_file)?;
            table::classify_with_chim_ids(&genome_ids, &interaction_ids, &chim_ids, &unmapped)
        }
        None => {
            let flags = table::yz_flag_values(&args.bam_file)?;
            table::classify_with_flags(&genome_ids, &interaction_ids, &flags)
        }
    };

    match &args.output_file {
        Some(path) => {
            let mut file = std::fs::File::create(path)?;
            table::write_markdown_table(&counts, &mut file)?;
            file.flush()?;
            info!("Classification table written to {}", path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            table::write_markdown_table(&counts, &mut handle)?;
        }
    }

    Ok(())
}
