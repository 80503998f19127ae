//! Parallel processing strategies for scanning verse files.
//!
//! - Batch-parallel (std::thread on batches of lines)
//! - Channel-pipeline (producer-consumer with mpsc channels)
//!
//! Both write records in input order.

use crate::{verse_lines, write_record, ScanOptions, Stats};
use latin_hexameter::{HexameterScanner, VerseRecord};

use std::collections::BTreeMap;
use std::io::{self, BufRead, BufWriter, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::debug;

/// Configuration for parallel processing
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    /// Number of threads to use
    pub num_threads: usize,
    /// Batch size for batch-parallel processing
    pub batch_size: usize,
    /// Channel buffer size for pipeline processing
    pub channel_buffer: usize,
    /// Number of worker threads for pipeline
    pub num_workers: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        let cpus = thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(4);
        Self {
            num_threads: cpus,
            batch_size: 1000,
            channel_buffer: 10000,
            num_workers: cpus.saturating_sub(1).max(1),
        }
    }
}

/// A scanned line tagged with its position in the input
#[derive(Debug)]
struct ScannedLine {
    line_id: usize,
    record: VerseRecord,
}

fn panicked(what: &str) -> io::Error {
    io::Error::other(format!("{} thread panicked", what))
}

/// Strategy 1: Batch-Parallel Processing using std::thread
/// Collects lines into batches, then scans each batch across threads
pub fn process_batch_parallel<W: Write>(
    reader: impl BufRead,
    writer: &mut BufWriter<W>,
    scanner: &Arc<HexameterScanner>,
    options: ScanOptions,
    config: &ParallelConfig,
) -> io::Result<Stats> {
    let start_time = Instant::now();
    let mut stats = Stats::default();
    let mut batch: Vec<String> = Vec::with_capacity(config.batch_size);

    let mut flush_batch = |batch: &mut Vec<String>, stats: &mut Stats| -> io::Result<()> {
        let records = process_batch_threaded(batch, scanner, options, config.num_threads)?;
        batch.clear();
        for record in records {
            write_record(writer, &record, scanner.formatter(), options.format)?;
            stats.record(&record);
        }
        Ok(())
    };

    for line in verse_lines(reader) {
        batch.push(line?);
        if batch.len() >= config.batch_size {
            flush_batch(&mut batch, &mut stats)?;
        }
    }

    // Process remaining batch
    if !batch.is_empty() {
        flush_batch(&mut batch, &mut stats)?;
    }

    writer.flush()?;
    stats.elapsed = start_time.elapsed();
    Ok(stats)
}

/// Scan a batch of lines using multiple threads, preserving order
fn process_batch_threaded(
    batch: &[String],
    scanner: &Arc<HexameterScanner>,
    options: ScanOptions,
    num_threads: usize,
) -> io::Result<Vec<VerseRecord>> {
    if batch.is_empty() {
        return Ok(vec![]);
    }

    let num_threads = num_threads.min(batch.len()).max(1);
    let chunk_size = batch.len().div_ceil(num_threads);

    let handles: Vec<JoinHandle<Vec<VerseRecord>>> = batch
        .chunks(chunk_size)
        .map(|chunk| {
            let chunk = chunk.to_vec();
            let scanner = Arc::clone(scanner);
            thread::spawn(move || {
                scanner.scan_many(
                    chunk.iter().map(String::as_str),
                    options.optional_transform,
                    options.dactyl_smoothing,
                )
            })
        })
        .collect();

    let mut results = Vec::with_capacity(batch.len());
    for handle in handles {
        results.extend(handle.join().map_err(|_| panicked("batch"))?);
    }
    Ok(results)
}

/// Strategy 2: Channel-Pipeline Processing using std::sync::mpsc
/// Producer thread reads lines, worker threads scan them, the main thread writes.
/// Results are reordered by line_id so output follows input order.
pub fn process_channel_pipeline<W: Write>(
    reader: impl BufRead + Send + 'static,
    writer: W,
    scanner: &Arc<HexameterScanner>,
    options: ScanOptions,
    config: &ParallelConfig,
) -> io::Result<Stats> {
    let (line_tx, line_rx): (SyncSender<(usize, String)>, Receiver<(usize, String)>) =
        sync_channel(config.channel_buffer);
    let (result_tx, result_rx): (SyncSender<ScannedLine>, Receiver<ScannedLine>) =
        sync_channel(config.channel_buffer);

    // Raised when the writer gives up, so the other threads stop early
    let stopped = Arc::new(AtomicBool::new(false));
    let start_time = Instant::now();

    let reader_stop_flag = Arc::clone(&stopped);
    let reader_handle = thread::spawn(move || read_lines_to_channel(reader, line_tx, &reader_stop_flag));

    let line_rx = Arc::new(Mutex::new(line_rx));
    let worker_handles: Vec<JoinHandle<()>> = (0..config.num_workers.max(1))
        .map(|_| {
            let rx = Arc::clone(&line_rx);
            let tx = result_tx.clone();
            let stop_flag = Arc::clone(&stopped);
            let scanner = Arc::clone(scanner);
            thread::spawn(move || scan_lines_worker(rx, tx, &scanner, options, &stop_flag))
        })
        .collect();

    // Drop extra sender so channel closes when workers finish
    drop(result_tx);

    let written = write_results_sorted(result_rx, writer, scanner, options);
    if written.is_err() {
        stopped.store(true, Ordering::SeqCst);
    }

    let read = reader_handle.join().map_err(|_| panicked("reader"))?;
    for handle in worker_handles {
        handle.join().map_err(|_| panicked("worker"))?;
    }

    let mut stats = written?;
    let lines_read = read?;
    debug!(lines_read, lines_written = stats.lines_scanned, "pipeline finished");

    stats.elapsed = start_time.elapsed();
    Ok(stats)
}

fn read_lines_to_channel(
    reader: impl BufRead,
    tx: SyncSender<(usize, String)>,
    stopped: &AtomicBool,
) -> io::Result<usize> {
    let mut line_id: usize = 0;
    for line in verse_lines(reader) {
        if stopped.load(Ordering::Relaxed) {
            break;
        }
        if tx.send((line_id, line?)).is_err() {
            break;
        }
        line_id += 1;
    }
    Ok(line_id)
}

fn scan_lines_worker(
    rx: Arc<Mutex<Receiver<(usize, String)>>>,
    tx: SyncSender<ScannedLine>,
    scanner: &HexameterScanner,
    options: ScanOptions,
    stopped: &AtomicBool,
) {
    loop {
        if stopped.load(Ordering::Relaxed) {
            break;
        }

        // Try to get next line from shared receiver
        let item = {
            let lock = rx.lock().ok();
            lock.and_then(|guard| guard.recv().ok())
        };

        let Some((line_id, line)) = item else {
            break;
        };
        let record = scanner.scan(&line, options.optional_transform, options.dactyl_smoothing);
        if tx.send(ScannedLine { line_id, record }).is_err() {
            break;
        }
    }
}

/// Write results in input order using a streaming reorder buffer.
///
/// Out-of-order results wait in a BTreeMap until their predecessors have
/// been written.
fn write_results_sorted<W: Write>(
    rx: Receiver<ScannedLine>,
    writer: W,
    scanner: &HexameterScanner,
    options: ScanOptions,
) -> io::Result<Stats> {
    let mut writer = BufWriter::with_capacity(256 * 1024, writer);
    let mut stats = Stats::default();

    let mut pending: BTreeMap<usize, VerseRecord> = BTreeMap::new();
    let mut next_expected: usize = 0;
    let mut max_pending: usize = 0;

    let mut write_one = |record: VerseRecord, stats: &mut Stats| -> io::Result<()> {
        write_record(&mut writer, &record, scanner.formatter(), options.format)?;
        stats.record(&record);
        Ok(())
    };

    for scanned in rx {
        if scanned.line_id != next_expected {
            pending.insert(scanned.line_id, scanned.record);
            max_pending = max_pending.max(pending.len());
            continue;
        }

        write_one(scanned.record, &mut stats)?;
        next_expected += 1;

        while let Some(buffered) = pending.remove(&next_expected) {
            write_one(buffered, &mut stats)?;
            next_expected += 1;
        }
    }

    // Only reachable when a worker stopped early
    for (_, record) in std::mem::take(&mut pending) {
        write_one(record, &mut stats)?;
    }

    debug!(max_pending, "reorder buffer high-water mark");
    writer.flush()?;
    Ok(stats)
}
