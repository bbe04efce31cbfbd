use crate::definitions::{IncidentTimeline, Severity, SeverityChange};
use crate::error::MockError;
use crate::services::fixtures::TimelineFixture;
use crate::time::parse_duration;

/// Spacing of generated samples, matching the UI's range query step.
pub const SAMPLE_STEP_SECONDS: i64 = 300;
/// Ongoing series stop this far before "now" so the newest sample is never
/// exactly at the query boundary.
pub const ONGOING_END_OFFSET_SECONDS: i64 = 60;
/// Upper bound on points per series, the same limit Prometheus enforces.
pub const MAX_SAMPLES_PER_SERIES: usize = 11_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricFamily {
    /// Health components map: value is the severity rank.
    Health,
    /// `ALERTS`: value is 1 while the alert fires at its own severity, else 0.
    Alerts,
}

impl MetricFamily {
    pub fn encode(self, resolved: Severity, own: Severity) -> String {
        match self {
            Self::Health => resolved.rank().to_string(),
            Self::Alerts => {
                if resolved == own {
                    "1".to_string()
                } else {
                    "0".to_string()
                }
            }
        }
    }
}

/// Requested `[start, end]` of a range query; open sides do not clip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryWindow {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl QueryWindow {
    pub fn new(start: Option<i64>, end: Option<i64>) -> Self {
        Self { start, end }
    }
}

/// Anchors a duration-relative timeline to `now`. `None` in, `None` out; the
/// caller picks its own default.
pub fn materialize_timeline(
    fixture: Option<&TimelineFixture>,
    now: i64,
) -> Result<Option<IncidentTimeline>, MockError> {
    let Some(fixture) = fixture else {
        return Ok(None);
    };
    let start = now - parse_duration(&fixture.start)?;
    let end = fixture
        .end
        .as_deref()
        .map(|raw| parse_duration(raw).map(|secs| now - secs))
        .transpose()?;
    let severity_changes = fixture
        .severity_changes
        .iter()
        .map(|change| {
            Ok(SeverityChange {
                timestamp: now - parse_duration(&change.time)?,
                severity: change.severity,
            })
        })
        .collect::<Result<Vec<_>, MockError>>()?;
    Ok(Some(IncidentTimeline {
        start,
        end,
        severity_changes,
    }))
}

/// Intersection of the series lifetime with the query window, or `None` when
/// they do not overlap.
pub fn effective_range(
    timeline: &IncidentTimeline,
    window: QueryWindow,
    now: i64,
) -> Option<(i64, i64)> {
    let series_end = timeline
        .end
        .unwrap_or(now - ONGOING_END_OFFSET_SECONDS);
    let start = window.start.map_or(timeline.start, |qs| qs.max(timeline.start));
    let end = window.end.map_or(series_end, |qe| qe.min(series_end));
    (start <= end).then_some((start, end))
}

/// Sample instants for `[start, end]`. Spans shorter than one step collapse to
/// a single sample at `start`; longer spans always end with a sample at `end`.
/// Spans needing more than [`MAX_SAMPLES_PER_SERIES`] points keep the newest ones.
pub fn sample_timestamps(start: i64, end: i64) -> Vec<i64> {
    let span = i128::from(end) - i128::from(start);
    if span < i128::from(SAMPLE_STEP_SECONDS) {
        return vec![start];
    }
    // One slot stays free for the boundary sample at `end`.
    let step = i128::from(SAMPLE_STEP_SECONDS);
    let grid_points = span / step + 1;
    let budget = MAX_SAMPLES_PER_SERIES as i128 - 1;
    let first = if grid_points > budget {
        i64::try_from(i128::from(start) + (grid_points - budget) * step).unwrap_or(end)
    } else {
        start
    };
    let mut timestamps: Vec<i64> = (first..=end)
        .step_by(SAMPLE_STEP_SECONDS as usize)
        .collect();
    if timestamps.last() != Some(&end) {
        timestamps.push(end);
    }
    timestamps
}

/// The `(timestamp, value)` pairs a range query returns for one series. Empty
/// when the series lies entirely outside the window.
pub fn generate_values(
    timeline: &IncidentTimeline,
    window: QueryWindow,
    severity: Severity,
    family: MetricFamily,
    now: i64,
) -> Vec<(i64, String)> {
    let Some((start, end)) = effective_range(timeline, window, now) else {
        return Vec::new();
    };
    sample_timestamps(start, end)
        .into_iter()
        .map(|ts| {
            let resolved = if timeline.severity_changes.is_empty() {
                severity
            } else {
                timeline.severity_at(ts, severity)
            };
            (ts, family.encode(resolved, severity))
        })
        .collect()
}
