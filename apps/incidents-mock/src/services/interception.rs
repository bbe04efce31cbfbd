use crate::definitions::IncidentDefinition;
use crate::error::MockError;
use crate::services::fixtures::{convert_fixture, IncidentScenarioFixture};
use crate::services::series::{
    build_alert_matrix, build_incident_matrix, build_instant_vector, references_health_metric,
    PrometheusInstantResult, PrometheusResult, ALERTS_METRIC,
};
use crate::services::timeline::{MetricFamily, QueryWindow};
use crate::time::Clock;

const ALERTS_SELECTOR: &str = "ALERTS{";

/// One installed mock configuration. Immutable once built; every request is
/// answered from the same definitions and the same captured "now".
#[derive(Debug, Clone)]
pub struct MockInstallation {
    pub now: i64,
    pub source: String,
    pub definitions: Vec<IncidentDefinition>,
}

impl MockInstallation {
    pub fn from_fixture(fixture: &IncidentScenarioFixture, clock: &Clock) -> Result<Self, MockError> {
        let now = clock.now_seconds();
        Ok(Self {
            now,
            source: fixture.name.clone(),
            definitions: convert_fixture(fixture, now)?,
        })
    }

    pub fn from_definitions(definitions: Vec<IncidentDefinition>, clock: &Clock) -> Self {
        Self {
            now: clock.now_seconds(),
            source: "definitions".to_string(),
            definitions,
        }
    }

    pub fn alert_count(&self) -> usize {
        self.definitions.iter().map(|incident| incident.alerts.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Intercept {
    Matrix(Vec<PrometheusResult>),
    Vector(Vec<PrometheusInstantResult>),
    PassThrough,
}

impl Intercept {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Matrix(_) => "matrix",
            Self::Vector(_) => "vector",
            Self::PassThrough => "pass_through",
        }
    }
}

/// Routing for `/api/v1/query_range`. Health metric queries (either name) take
/// precedence over `ALERTS{` queries; anything else passes through.
pub fn intercept_range(installation: &MockInstallation, query: &str, window: QueryWindow) -> Intercept {
    if references_health_metric(query) {
        return Intercept::Matrix(build_incident_matrix(
            &installation.definitions,
            query,
            window,
            installation.now,
        ));
    }
    if query.contains(ALERTS_SELECTOR) {
        return Intercept::Matrix(build_alert_matrix(
            &installation.definitions,
            query,
            window,
            installation.now,
        ));
    }
    Intercept::PassThrough
}

/// Routing for `/api/v1/query`. Only the `min_over_time(timestamp(...))`
/// earliest-start lookup is answered.
pub fn intercept_instant(
    installation: &MockInstallation,
    query: &str,
    eval_time: Option<i64>,
) -> Intercept {
    if !(query.contains("min_over_time") && query.contains("timestamp")) {
        return Intercept::PassThrough;
    }
    let family = if references_health_metric(query) {
        MetricFamily::Health
    } else if query.contains(ALERTS_METRIC) {
        MetricFamily::Alerts
    } else {
        return Intercept::PassThrough;
    };
    Intercept::Vector(build_instant_vector(
        &installation.definitions,
        query,
        family,
        installation.now,
        eval_time.unwrap_or(installation.now),
    ))
}
