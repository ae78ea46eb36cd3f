use std::fmt;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    Failed,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Passed => write!(f, "PASSED"),
            Verdict::Failed => write!(f, "FAILED"),
        }
    }
}

/// Evaluation result for a single declared threshold. For a failing
/// threshold this is the only user-visible diagnostic: the metric, the
/// observed value, and the required bound.
#[derive(Clone, Debug, PartialEq)]
pub struct ThresholdReport {
    pub metric: String,
    pub check: String,
    pub observed: Observed,
    pub passed: bool,
}

/// Observed value a threshold was evaluated against.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Observed {
    Latency(Duration),
    Rate(f64),
    /// No data points were recorded for the metric; the threshold passes
    /// by vacuity.
    Vacuous,
}

impl fmt::Display for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observed::Latency(dur) => write!(f, "{:.2?}", dur),
            Observed::Rate(rate) => write!(f, "{rate:.4}"),
            Observed::Vacuous => write!(f, "no data"),
        }
    }
}

/// Per-operation success/error counts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpStats {
    pub name: String,
    pub success: u64,
    pub error: u64,
}

/// Final statistics for a completed run.
#[derive(Clone, Debug)]
pub struct RunReport {
    pub verdict: Verdict,
    pub elapsed: Duration,
    pub requests: u64,
    pub success: u64,
    pub error: u64,
    pub connect_failures: u64,
    /// Highest live-worker count observed by the scheduler.
    pub peak_concurrency: usize,
    pub operations: Vec<OpStats>,
    pub latency_p50: Duration,
    pub latency_p90: Duration,
    pub latency_p95: Duration,
    pub latency_p99: Duration,
    pub thresholds: Vec<ThresholdReport>,
}

impl RunReport {
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Passed
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "run {} in {} ({} requests, {} ok, {} failed, {} connect failures)",
            self.verdict,
            humantime::format_duration(Duration::from_secs(self.elapsed.as_secs())),
            self.requests,
            self.success,
            self.error,
            self.connect_failures,
        )?;
        writeln!(f, "peak concurrency: {}", self.peak_concurrency)?;
        writeln!(
            f,
            "latency p50={:.2?} p90={:.2?} p95={:.2?} p99={:.2?}",
            self.latency_p50, self.latency_p90, self.latency_p95, self.latency_p99,
        )?;
        for op in &self.operations {
            writeln!(f, "  {}: {} ok, {} failed", op.name, op.success, op.error)?;
        }
        for t in &self.thresholds {
            let status = if t.passed { "pass" } else { "FAIL" };
            writeln!(
                f,
                "  [{status}] {}: `{}` observed {}",
                t.metric, t.check, t.observed
            )?;
        }
        Ok(())
    }
}
