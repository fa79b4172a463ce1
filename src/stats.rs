/// Counters for a single extraction run.
///
/// Each worker keeps its own copy and hands it over with its shutdown
/// acknowledgment; the coordinator merges them, so nothing is shared while
/// the pool is running.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionStats {
    pub pages_decoded: u64,
    pub pages_processed: u64,
    pub lines_emitted: u64,
    pub lines_forwarded: u64,
    pub lines_written: u64,
    pub record_failures: u64,
}

impl ExtractionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_processed(&mut self) {
        self.pages_processed += 1;
    }

    pub fn add_lines(&mut self, count: u64) {
        self.lines_emitted += count;
    }

    pub fn inc_forwarded(&mut self) {
        self.lines_forwarded += 1;
    }

    pub fn inc_failures(&mut self) {
        self.record_failures += 1;
    }

    /// Folds a worker report into the run totals.
    ///
    /// `pages_decoded` and `lines_written` belong to the coordinator and the
    /// collector and are left alone.
    pub fn merge(&mut self, report: &ExtractionStats) {
        self.pages_processed += report.pages_processed;
        self.lines_emitted += report.lines_emitted;
        self.lines_forwarded += report.lines_forwarded;
        self.record_failures += report.record_failures;
    }
}
