//! Metrics reporting.
//!
//! The dispatcher needs two things from a metrics backend: a counter for
//! requests that matched no endpoint, and a way to gather everything
//! recorded so far for the internal scrape endpoint. [`Metrics`] is that
//! seam; [`PrometheusMetrics`] is the stock implementation on top of the
//! `metrics` facade and its Prometheus exporter.
//!
//! # Metrics
//! - `unknown_endpoint_total` (counter): requests that matched no endpoint,
//!   labelled `service` and `endpoint`

use std::io::Write;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

/// Name of the unknown-endpoint counter.
pub const UNKNOWN_ENDPOINT: &str = "unknown_endpoint_total";

/// Errors from gathering or encoding metrics.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("{0}")]
    Gather(String),

    #[error("metric family `{0}` has no samples")]
    EmptyFamily(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The metrics capability consumed by the dispatcher.
///
/// Implementations must tolerate concurrent calls from every connection
/// task; the dispatcher holds no lock around them.
pub trait Metrics: Send + Sync + 'static {
    /// Records one request that matched no endpoint.
    fn unknown_endpoint(&self, service: &str, api: &str);

    /// Snapshot of every metric family recorded so far.
    fn gather(&self) -> Result<Vec<MetricFamily>, MetricsError>;
}

/// One metric family in text exposition form: its `# HELP` / `# TYPE`
/// comment lines followed by its samples.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricFamily {
    pub name: String,
    pub lines: Vec<String>,
}

impl MetricFamily {
    fn has_samples(&self) -> bool {
        self.lines.iter().any(|l| !l.starts_with('#'))
    }
}

/// Writes one family followed by the blank line that delimits it from the
/// next.
pub fn encode<W: Write>(family: &MetricFamily, out: &mut W) -> Result<(), MetricsError> {
    if !family.has_samples() {
        return Err(MetricsError::EmptyFamily(family.name.clone()));
    }
    for line in &family.lines {
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")?;
    }
    out.write_all(b"\n")?;
    Ok(())
}

/// Splits rendered exposition text into families. A family starts at its
/// first `# HELP` or `# TYPE` line; blank lines are separators only.
pub fn parse_exposition(text: &str) -> Vec<MetricFamily> {
    let mut families: Vec<MetricFamily> = Vec::new();
    for line in text.lines().map(str::trim_end).filter(|l| !l.is_empty()) {
        let header_name = line
            .strip_prefix("# HELP ")
            .or_else(|| line.strip_prefix("# TYPE "))
            .and_then(|rest| rest.split_whitespace().next());

        match (header_name, families.last_mut()) {
            (Some(name), Some(last)) if last.name == name => last.lines.push(line.to_owned()),
            (Some(name), _) => families.push(MetricFamily {
                name: name.to_owned(),
                lines: vec![line.to_owned()],
            }),
            (None, Some(last)) => last.lines.push(line.to_owned()),
            (None, None) => families.push(MetricFamily {
                name: sample_name(line).to_owned(),
                lines: vec![line.to_owned()],
            }),
        }
    }
    families
}

fn sample_name(line: &str) -> &str {
    line.split(['{', ' ']).next().unwrap_or(line)
}

/// Prometheus-backed [`Metrics`].
///
/// The recorder is owned by this value rather than installed globally, so
/// several independent instances can coexist in one process.
pub struct PrometheusMetrics {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

impl PrometheusMetrics {
    pub fn new() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        ::metrics::with_local_recorder(&recorder, || {
            ::metrics::describe_counter!(
                UNKNOWN_ENDPOINT,
                "Requests that matched no registered endpoint."
            );
        });
        Self { recorder, handle }
    }

    /// The full exposition text, as the scrape endpoint would serve it.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

impl Default for PrometheusMetrics {
    fn default() -> Self { Self::new() }
}

impl Metrics for PrometheusMetrics {
    fn unknown_endpoint(&self, service: &str, api: &str) {
        ::metrics::with_local_recorder(&self.recorder, || {
            ::metrics::counter!(
                UNKNOWN_ENDPOINT,
                "service" => service.to_owned(),
                "endpoint" => api.to_owned()
            )
            .increment(1);
        });
    }

    fn gather(&self) -> Result<Vec<MetricFamily>, MetricsError> {
        Ok(parse_exposition(&self.handle.render()))
    }
}
