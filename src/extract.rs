use crate::config::{INTAKE_DEPTH, OUTTAKE_DEPTH, PROGRESS_INTERVAL};
use crate::models::Page;
use crate::sink::Sink;
use crate::stats::ExtractionStats;
use crate::strategy::Extractor;
use anyhow::{anyhow, bail, Context, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use indicatif::ProgressBar;
use std::io::Write;
use std::num::NonZeroUsize;
use std::thread;
use tracing::{debug, info, trace, warn};

/// Unit of work on the intake channel.
enum Work {
    Page(Page),
    /// Tells exactly one worker to finish.
    Stop,
}

/// Runs `pages` through a pool of `workers` threads sharing one extractor and
/// writes every produced line to `sink`.
///
/// Pages are fed from the calling thread. Once they run out, or the collector
/// has died, one stop signal per worker goes onto the intake and the output
/// channel is only closed after every worker has acknowledged, so no line is
/// lost. Output order across workers is unspecified.
///
/// Returns the merged run statistics and the sink's writer.
pub fn run_extraction<I, W>(
    pages: I,
    extractor: &Extractor,
    workers: NonZeroUsize,
    sink: Sink<W>,
) -> Result<(ExtractionStats, W)>
where
    I: IntoIterator<Item = Page>,
    W: Write + Send,
{
    let workers = workers.get();
    info!(
        strategy = extractor.strategy().name(),
        workers, "Starting extraction"
    );

    thread::scope(|scope| {
        let (intake_tx, intake_rx) = bounded::<Work>(workers * INTAKE_DEPTH);
        let (lines_tx, lines_rx) = bounded::<String>(workers * OUTTAKE_DEPTH);
        let (ack_tx, ack_rx) = bounded::<ExtractionStats>(0);

        let collector = thread::Builder::new()
            .name("wikistream-collector".into())
            .spawn_scoped(scope, move || sink.collect(lines_rx))
            .context("Failed to spawn collector thread")?;

        for id in 0..workers {
            let intake = intake_rx.clone();
            let lines = lines_tx.clone();
            let ack = ack_tx.clone();
            thread::Builder::new()
                .name(format!("wikistream-worker-{}", id))
                .spawn_scoped(scope, move || worker_loop(id, extractor, intake, lines, ack))
                .context("Failed to spawn worker thread")?;
        }
        drop(intake_rx);
        drop(ack_tx);

        let pb = ProgressBar::new_spinner();
        let mut decoded = 0u64;
        for page in pages {
            // the collector only returns early when writing failed
            if collector.is_finished() {
                warn!(pages = decoded, "Output closed, stopping input");
                break;
            }
            if intake_tx.send(Work::Page(page)).is_err() {
                bail!("All workers exited before the input was consumed");
            }
            decoded += 1;
            if decoded % PROGRESS_INTERVAL == 0 {
                pb.set_message(format!("{} pages", decoded));
                pb.tick();
            }
        }
        pb.finish_and_clear();
        debug!(pages = decoded, "Draining workers");

        for _ in 0..workers {
            if intake_tx.send(Work::Stop).is_err() {
                bail!("All workers exited before shutdown");
            }
        }

        let mut stats = ExtractionStats::new();
        stats.pages_decoded = decoded;
        for acknowledged in 1..=workers {
            let report = ack_rx
                .recv()
                .map_err(|_| anyhow!("Worker exited without acknowledging shutdown"))?;
            trace!(acknowledged, "Worker acknowledged shutdown");
            stats.merge(&report);
        }

        // every worker is done; closing the last sender lets the collector finish
        drop(lines_tx);
        let (written, writer) = collector
            .join()
            .map_err(|_| anyhow!("Collector thread panicked"))??;
        stats.lines_written = written;

        info!(
            pages = stats.pages_decoded,
            processed = stats.pages_processed,
            lines = stats.lines_written,
            failures = stats.record_failures,
            "Extraction finished"
        );
        Ok((stats, writer))
    })
}

fn worker_loop(
    id: usize,
    extractor: &Extractor,
    intake: Receiver<Work>,
    lines: Sender<String>,
    ack: Sender<ExtractionStats>,
) {
    let mut report = ExtractionStats::new();
    let mut sink_closed = false;

    // a disconnected intake only happens when the coordinator bailed out
    while let Ok(work) = intake.recv() {
        let page = match work {
            Work::Page(page) => page,
            Work::Stop => break,
        };
        report.inc_processed();

        match extractor.process(page) {
            Ok(produced) => {
                report.add_lines(produced.len() as u64);
                if sink_closed {
                    continue;
                }
                for line in produced {
                    if lines.send(line).is_err() {
                        warn!(worker = id, "Output closed, discarding remaining lines");
                        sink_closed = true;
                        break;
                    }
                    report.inc_forwarded();
                }
            }
            Err(e) => {
                report.inc_failures();
                let e = anyhow::Error::from(e);
                warn!(worker = id, error = %format!("{:#}", e), "Skipping page");
            }
        }
    }

    debug!(worker = id, pages = report.pages_processed, "Worker finished");
    drop(lines);
    let _ = ack.send(report);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{Strategy, StrategyOptions};
    use std::cell::Cell;

    fn vanilla() -> Extractor {
        Extractor::new(Strategy::Vanilla).unwrap()
    }

    fn workers(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn run(pages: Vec<Page>, extractor: &Extractor, n: usize) -> (ExtractionStats, Vec<String>) {
        let (stats, buf) = run_extraction(pages, extractor, workers(n), Sink::new(Vec::new())).unwrap();
        let out = String::from_utf8(buf).unwrap();
        let mut lines: Vec<String> = out.lines().map(String::from).collect();
        lines.sort();
        (stats, lines)
    }

    fn numbered_pages(count: usize) -> Vec<Page> {
        (0..count)
            .map(|i| {
                Page::new(
                    format!("Page {}", i),
                    format!("[[Category:Even {}]] [[Category:Odd {}|key]]", i % 2, i % 3),
                )
            })
            .collect()
    }

    #[test]
    fn empty_input_shuts_down_cleanly() {
        let (stats, lines) = run(Vec::new(), &vanilla(), 4);
        assert!(lines.is_empty());
        assert_eq!(stats.pages_decoded, 0);
        assert_eq!(stats.lines_written, 0);
    }

    #[test]
    fn every_page_is_processed_exactly_once() {
        let (stats, lines) = run(numbered_pages(500), &vanilla(), 8);
        assert_eq!(stats.pages_decoded, 500);
        assert_eq!(stats.pages_processed, 500);
        assert_eq!(stats.lines_emitted, 500);
        assert_eq!(stats.lines_written, 500);
        assert_eq!(lines.len(), 500);
    }

    #[test]
    fn output_multiset_independent_of_worker_count() {
        let options = StrategyOptions {
            category_marker: Some("Category".into()),
            ..StrategyOptions::default()
        };
        let extractor = Extractor::new(Strategy::select(&options).unwrap()).unwrap();

        let (_, single) = run(numbered_pages(300), &extractor, 1);
        let (_, many) = run(numbered_pages(300), &extractor, 8);
        assert_eq!(single.len(), 600);
        assert_eq!(single, many);
    }

    #[test]
    fn single_worker_preserves_input_order() {
        let pages = numbered_pages(50);
        let (_, buf) =
            run_extraction(pages, &vanilla(), workers(1), Sink::new(Vec::new())).unwrap();
        let out = String::from_utf8(buf).unwrap();
        let titles: Vec<String> = out
            .lines()
            .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap()["title"].to_string())
            .collect();
        let expected: Vec<String> = (0..50).map(|i| format!("\"Page {}\"", i)).collect();
        assert_eq!(titles, expected);
    }

    #[test]
    fn failed_pages_do_not_stop_the_pool() {
        let extractor = Extractor::new(Strategy::Wikidata).unwrap();
        let pages = vec![
            Page::new("Q1", r#"{"id":"Q1"}"#),
            Page::new("Q2", "{broken"),
            Page::new("Q3", r#"{"id":"Q3"}"#),
            Page::new("Q4", ""),
        ];
        let (stats, lines) = run(pages, &extractor, 3);
        assert_eq!(stats.pages_processed, 4);
        assert_eq!(stats.record_failures, 2);
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn more_workers_than_pages() {
        let (stats, lines) = run(numbered_pages(2), &vanilla(), 16);
        assert_eq!(stats.pages_processed, 2);
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn every_worker_acknowledges_once() {
        // a lost acknowledgment drops that worker's report from the total
        for n in [1, 2, 7] {
            let (stats, _) = run(numbered_pages(n * 10), &vanilla(), n);
            assert_eq!(stats.pages_processed, (n * 10) as u64);
        }
    }

    #[test]
    fn collector_writes_exactly_what_workers_forwarded() {
        let options = StrategyOptions {
            category_marker: Some("Category".into()),
            ..StrategyOptions::default()
        };
        let extractor = Extractor::new(Strategy::select(&options).unwrap()).unwrap();

        // the output closes right after the last acknowledgment, so any line
        // sent later would either be lost or show up as a mismatch here
        for n in [1, 3, 8] {
            let (stats, lines) = run(numbered_pages(1000), &extractor, n);
            assert_eq!(stats.lines_forwarded, 2000);
            assert_eq!(stats.lines_written, stats.lines_forwarded);
            assert_eq!(lines.len() as u64, stats.lines_written);
        }
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn sink_failure_stops_reading_input() {
        const TOTAL: u64 = 200_000;
        let pulled = Cell::new(0u64);
        let pages = (0..TOTAL).map(|i| {
            pulled.set(pulled.get() + 1);
            Page::new(format!("Page {}", i), "some text")
        });

        let result = run_extraction(pages, &vanilla(), workers(4), Sink::new(FailingWriter));
        assert!(result.is_err());
        assert!(
            pulled.get() < TOTAL / 2,
            "decoder kept reading after the output failed: {} pages",
            pulled.get()
        );
    }

    #[test]
    fn sink_failure_is_reported_without_deadlock() {
        let pages = numbered_pages(20_000);
        let result = run_extraction(pages, &vanilla(), workers(4), Sink::new(FailingWriter));
        assert!(result.is_err());
    }
}
