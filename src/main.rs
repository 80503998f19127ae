use bzip2::read::BzDecoder;
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use latin_hexameter::{HexameterScanner, MetricalConstants, Note, ScansionFormatter, VerseRecord};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

mod parallel;
use parallel::{process_batch_parallel, process_channel_pipeline, ParallelConfig};

/// Processing strategy for scanning
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// One line at a time on the main thread
    Sequential,
    /// Batches of lines split across threads
    BatchParallel,
    /// Reader, worker and writer threads connected by channels
    ChannelPipeline,
}

/// Output format for scanned lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Line, foot-separated scansion and notes
    Text,
    /// One JSON record per line
    Json,
}

#[derive(Parser)]
#[command(name = "hexameter-scan")]
#[command(about = "Scan Latin dactylic hexameter - one verse per input line")]
struct Args {
    /// Input file (.txt or .txt.bz2); stdin when omitted or "-"
    input: Option<PathBuf>,

    /// Output file; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Use the permissive i to j rewrite from the start
    #[arg(long)]
    optional_transform: bool,

    /// Enable dactyl-chain smoothing as the last repair
    #[arg(long)]
    dactyl_smoothing: bool,

    /// Processing strategy
    #[arg(short, long, value_enum, default_value_t = Strategy::ChannelPipeline)]
    strategy: Strategy,

    /// Number of threads (4 = default, 0 = auto-detect)
    #[arg(short, long, default_value_t = 4)]
    threads: usize,

    /// Batch size for batch-parallel strategy
    #[arg(long, default_value_t = 1000)]
    batch_size: usize,

    /// Channel buffer size for channel-pipeline strategy
    #[arg(long, default_value_t = 10000)]
    channel_buffer: usize,

    /// Limit number of lines to scan (sequential only)
    #[arg(long)]
    limit: Option<usize>,

    /// YAML file overriding the metrical constants
    #[arg(long)]
    constants: Option<PathBuf>,

    /// Quiet mode - no progress or summary
    #[arg(short, long)]
    quiet: bool,

    /// Log each repair as it is applied
    #[arg(short, long)]
    verbose: bool,
}

/// Per-line scanning switches shared by every strategy
#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    pub optional_transform: bool,
    pub dactyl_smoothing: bool,
    pub format: OutputFormat,
}

#[derive(Debug, Default)]
pub struct Stats {
    pub lines_scanned: usize,
    pub valid: usize,
    pub invalid: usize,
    pub too_short: usize,
    pub too_long: usize,
    // Valid, but only after at least one repair
    pub repaired: usize,
    pub elapsed: Duration,
}

impl Stats {
    pub fn record(&mut self, record: &VerseRecord) {
        self.lines_scanned += 1;
        if record.valid() {
            self.valid += 1;
            if !record.has_note(Note::Positionally) {
                self.repaired += 1;
            }
        } else {
            self.invalid += 1;
            if record.has_note(Note::TooShort) {
                self.too_short += 1;
            } else if record.has_note(Note::TooLong) {
                self.too_long += 1;
            }
        }
    }
}

/// Write one scanned line in the chosen format.
pub fn write_record<W: Write>(
    writer: &mut W,
    record: &VerseRecord,
    formatter: &ScansionFormatter,
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string(record)?;
            writeln!(writer, "{}", json)
        }
        OutputFormat::Text => {
            let status = if record.valid() { "valid" } else { "invalid" };
            writeln!(writer, "{}", record.original())?;
            writeln!(
                writer,
                "    {}  [{}] {}",
                formatter.hexameter_feet_display(record.scansion()),
                status,
                record.notes().join(" ")
            )
        }
    }
}

/// Lines worth scanning: everything but blank lines, trimmed.
pub fn verse_lines(reader: impl BufRead) -> impl Iterator<Item = io::Result<String>> {
    reader.lines().filter_map(|line| match line {
        Ok(line) if line.trim().is_empty() => None,
        Ok(line) => Some(Ok(line.trim().to_string())),
        Err(e) => Some(Err(e)),
    })
}

fn open_input(path: Option<&PathBuf>) -> io::Result<Box<dyn BufRead + Send>> {
    match path {
        Some(path) if path.as_os_str() != "-" => {
            let file = File::open(path)?;
            if path.to_string_lossy().ends_with(".bz2") {
                Ok(Box::new(BufReader::with_capacity(256 * 1024, BzDecoder::new(file))))
            } else {
                Ok(Box::new(BufReader::with_capacity(256 * 1024, file)))
            }
        }
        _ => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

fn open_output(path: Option<&PathBuf>) -> io::Result<Box<dyn Write + Send>> {
    match path {
        Some(path) => Ok(Box::new(File::create(path)?)),
        None => Ok(Box::new(io::stdout())),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn build_scanner(constants_path: Option<&PathBuf>) -> Result<HexameterScanner, String> {
    let Some(path) = constants_path else {
        return Ok(HexameterScanner::default());
    };
    let constants = MetricalConstants::from_path(path)
        .map_err(|e| format!("Failed to load constants {:?}: {}", path, e))?;
    HexameterScanner::new(Arc::new(constants)).map_err(|e| format!("Invalid constants: {}", e))
}

/// Run sequential processing (baseline)
fn run_sequential<W: Write>(
    reader: impl BufRead,
    writer: &mut BufWriter<W>,
    scanner: &HexameterScanner,
    options: ScanOptions,
    limit: Option<usize>,
    quiet: bool,
) -> io::Result<Stats> {
    let start_time = Instant::now();
    let mut stats = Stats::default();

    let pb = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb
    };

    let mut limit_reached = false;
    for line in verse_lines(reader) {
        let line = line?;
        let record = scanner.scan(&line, options.optional_transform, options.dactyl_smoothing);
        write_record(writer, &record, scanner.formatter(), options.format)?;
        stats.record(&record);

        if !quiet && stats.lines_scanned % 1000 == 0 {
            let elapsed = start_time.elapsed().as_secs_f64();
            let rate = stats.lines_scanned as f64 / elapsed;
            pb.set_message(format!(
                "Lines: {} | Valid: {} | Invalid: {} | Rate: {:.0} lines/s",
                stats.lines_scanned, stats.valid, stats.invalid, rate
            ));
        }

        if let Some(l) = limit {
            if stats.lines_scanned >= l {
                limit_reached = true;
                break;
            }
        }
    }

    writer.flush()?;

    match limit {
        Some(l) if limit_reached && !quiet => {
            pb.finish_with_message(format!("Reached limit of {} lines", l))
        }
        _ => pb.finish_and_clear(),
    }

    stats.elapsed = start_time.elapsed();
    Ok(stats)
}

fn print_stats(stats: &Stats, strategy_name: &str) {
    let pct = |n: usize| 100.0 * n as f64 / stats.lines_scanned.max(1) as f64;
    eprintln!();
    eprintln!("============================================================");
    eprintln!("Strategy: {}", strategy_name);
    eprintln!("Lines scanned: {}", stats.lines_scanned);
    eprintln!("Valid: {} ({:.1}%)", stats.valid, pct(stats.valid));
    eprintln!("  after repair: {}", stats.repaired);
    eprintln!("Invalid: {} ({:.1}%)", stats.invalid, pct(stats.invalid));
    eprintln!("  too short: {}", stats.too_short);
    eprintln!("  too long: {}", stats.too_long);
    eprintln!("Time: {}m {}s", stats.elapsed.as_secs() / 60, stats.elapsed.as_secs() % 60);
    eprintln!(
        "Rate: {:.0} lines/sec",
        stats.lines_scanned as f64 / stats.elapsed.as_secs_f64().max(f64::EPSILON)
    );
    eprintln!("============================================================");
}

fn main() -> io::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let scanner = match build_scanner(args.constants.as_ref()) {
        Ok(scanner) => Arc::new(scanner),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    // Validate: --limit requires sequential mode for early termination
    if args.limit.is_some() && args.strategy != Strategy::Sequential {
        eprintln!(
            "Error: --limit requires --strategy sequential.\n\
             Parallel strategies scan lines out of order and reorder the results,\n\
             so they cannot stop early when the limit is reached."
        );
        std::process::exit(1);
    }

    // Build parallel config
    let mut config = ParallelConfig::default();
    if args.threads > 0 {
        config.num_threads = args.threads;
        config.num_workers = args.threads.saturating_sub(1).max(1);
    }
    config.batch_size = args.batch_size.max(1);
    config.channel_buffer = args.channel_buffer.max(1);

    let options = ScanOptions {
        optional_transform: args.optional_transform,
        dactyl_smoothing: args.dactyl_smoothing,
        format: args.format,
    };

    let reader = open_input(args.input.as_ref())?;
    let output = open_output(args.output.as_ref())?;

    let stats = match args.strategy {
        Strategy::Sequential => {
            let mut writer = BufWriter::with_capacity(256 * 1024, output);
            run_sequential(reader, &mut writer, &scanner, options, args.limit, args.quiet)?
        }
        Strategy::BatchParallel => {
            let mut writer = BufWriter::with_capacity(256 * 1024, output);
            process_batch_parallel(reader, &mut writer, &scanner, options, &config)?
        }
        Strategy::ChannelPipeline => {
            process_channel_pipeline(reader, output, &scanner, options, &config)?
        }
    };

    if !args.quiet {
        print_stats(&stats, &format!("{:?}", args.strategy));
    }

    Ok(())
}
