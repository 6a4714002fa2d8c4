//! Console output of benchmark results and scoped phase timers.
//!
//! Every phase prints exactly one `<name>: <seconds>` line through a [`Timer`], and phases that
//! move a known amount of data follow up with a `MB/s <value>` line. Diagnostics never go through
//! the [`Reporter`]; they are logged with `tracing` to stderr.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Destination for benchmark result lines.
///
/// Results go to stdout by default. A capturing reporter keeps the lines in memory instead,
/// which allows asserting on the output of a run.
#[derive(Clone, Debug, Default)]
pub struct Reporter {
    captured: Option<Arc<Mutex<Vec<String>>>>,
}

impl Reporter {
    /// Creates a reporter that prints to stdout.
    pub fn stdout() -> Self {
        Self::default()
    }

    /// Creates a reporter that records lines in memory.
    pub fn capturing() -> Self {
        Self {
            captured: Some(Arc::default()),
        }
    }

    /// Returns all lines recorded by a capturing reporter.
    pub fn lines(&self) -> Vec<String> {
        match self.captured {
            Some(ref captured) => captured.lock().unwrap().clone(),
            None => Vec::new(),
        }
    }

    fn line(&self, line: String) {
        match self.captured {
            Some(ref captured) => captured.lock().unwrap().push(line),
            None => println!("{line}"),
        }
    }

    /// Reports the duration of a named span.
    pub fn span(&self, name: &str, elapsed: Duration) {
        self.line(format!("{name}: {}", elapsed.as_secs_f64()));
    }

    /// Reports a throughput figure in MB/s.
    pub fn throughput(&self, mb_per_sec: f64) {
        self.line(format!("MB/s {mb_per_sec}"));
    }

    /// Starts a timer for the span `name`.
    pub fn timer(&self, name: impl Into<String>) -> Timer {
        Timer {
            name: name.into(),
            start: Instant::now(),
            reporter: self.clone(),
            closed: false,
        }
    }
}

/// A running span measurement.
///
/// The span is reported exactly once: either when [`finish`](Self::finish) is called, or when the
/// timer is dropped on any other exit path, including early returns via `?` and panics.
#[derive(Debug)]
#[must_use = "the span ends as soon as the timer is dropped"]
pub struct Timer {
    name: String,
    start: Instant,
    reporter: Reporter,
    closed: bool,
}

impl Timer {
    /// Time elapsed since the timer was started.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Ends the span, reports it, and returns its duration.
    pub fn finish(mut self) -> Duration {
        self.close()
    }

    fn close(&mut self) -> Duration {
        let elapsed = self.start.elapsed();
        if !self.closed {
            self.closed = true;
            self.reporter.span(&self.name, elapsed);
        }
        elapsed
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.close();
    }
}

/// Computes throughput in MB/s (10^6 bytes per second).
pub fn throughput(bytes: u64, elapsed: Duration) -> f64 {
    bytes as f64 / 1e6 / elapsed.as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_span(line: &str, name: &str) -> f64 {
        let seconds = line
            .strip_prefix(name)
            .and_then(|rest| rest.strip_prefix(": "))
            .unwrap_or_else(|| panic!("unexpected line `{line}`"));
        seconds.parse().unwrap()
    }

    #[test]
    fn finish_reports_once() {
        let reporter = Reporter::capturing();
        let timer = reporter.timer("write_large_file");
        std::thread::sleep(Duration::from_millis(5));
        let elapsed = timer.finish();

        let lines = reporter.lines();
        assert_eq!(lines.len(), 1);
        let reported = parse_span(&lines[0], "write_large_file");
        assert!(reported >= 0.005);
        assert_eq!(reported, elapsed.as_secs_f64());
    }

    #[test]
    fn drop_reports_on_error_path() {
        fn read_byte() -> Result<u8, &'static str> {
            Err("short read")
        }

        fn failing(reporter: &Reporter) -> Result<u8, &'static str> {
            let _timer = reporter.timer("seek_speed");
            let byte = read_byte()?;
            Ok(byte)
        }

        let reporter = Reporter::capturing();
        assert!(failing(&reporter).is_err());

        let lines = reporter.lines();
        assert_eq!(lines.len(), 1);
        assert!(parse_span(&lines[0], "seek_speed") >= 0.0);
    }

    #[test]
    fn drop_reports_on_panic() {
        let reporter = Reporter::capturing();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _timer = reporter.timer("multi_read");
            panic!("worker crashed");
        }));

        assert!(result.is_err());
        assert_eq!(reporter.lines().len(), 1);
    }

    #[test]
    fn reports_throughput() {
        let reporter = Reporter::capturing();
        reporter.throughput(throughput(5_000_000, Duration::from_secs(2)));
        assert_eq!(reporter.lines(), ["MB/s 2.5"]);
    }

    #[test]
    fn throughput_is_positive_and_finite() {
        let mbps = throughput(1_000_000, Duration::from_millis(250));
        assert!(mbps.is_finite());
        assert_eq!(mbps, 4.0);
    }
}
