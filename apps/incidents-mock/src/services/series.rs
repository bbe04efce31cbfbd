use serde::Serialize;
use std::collections::BTreeMap;

use crate::definitions::{AlertDefinition, IncidentDefinition};
use crate::services::selectors::LabelFilter;
use crate::services::timeline::{generate_values, MetricFamily, QueryWindow};

pub const HEALTH_METRIC_NEW: &str = "cluster_health_components_map";
pub const HEALTH_METRIC_OLD: &str = "cluster:health:components:map";
pub const ALERTS_METRIC: &str = "ALERTS";

// Present on the real series; the console reads some of them defensively.
const INFRA_JOB: &str = "cluster-health-analyzer";
const INFRA_INSTANCE: &str = "10.128.0.134:8443";
const INFRA_PROMETHEUS: &str = "openshift-monitoring/k8s";

pub type Labels = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrometheusResult {
    pub metric: Labels,
    pub values: Vec<(i64, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrometheusInstantResult {
    pub metric: Labels,
    pub value: (i64, String),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryData<T> {
    pub result_type: &'static str,
    pub result: Vec<T>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse<T> {
    pub status: &'static str,
    pub data: QueryData<T>,
}

pub fn matrix_response(result: Vec<PrometheusResult>) -> QueryResponse<PrometheusResult> {
    QueryResponse {
        status: "success",
        data: QueryData {
            result_type: "matrix",
            result,
        },
    }
}

pub fn vector_response(
    result: Vec<PrometheusInstantResult>,
) -> QueryResponse<PrometheusInstantResult> {
    QueryResponse {
        status: "success",
        data: QueryData {
            result_type: "vector",
            result,
        },
    }
}

/// Health metric name to echo back: the renamed metric when the query uses
/// it, the legacy name otherwise.
pub fn health_metric_name(query: &str) -> &'static str {
    if query.contains(HEALTH_METRIC_NEW) {
        HEALTH_METRIC_NEW
    } else {
        HEALTH_METRIC_OLD
    }
}

pub fn references_health_metric(query: &str) -> bool {
    query.contains(HEALTH_METRIC_NEW) || query.contains(HEALTH_METRIC_OLD)
}

fn insert(labels: &mut Labels, key: &str, value: &str) {
    labels.insert(key.to_string(), value.to_string());
}

fn infra_labels(labels: &mut Labels, incident: &IncidentDefinition) {
    insert(labels, "job", INFRA_JOB);
    insert(labels, "instance", INFRA_INSTANCE);
    insert(labels, "prometheus", INFRA_PROMETHEUS);
    if let Some(cluster) = &incident.managed_cluster {
        insert(labels, "managed_cluster", cluster);
    }
}

fn health_labels(metric: &str, incident: &IncidentDefinition, alert: &AlertDefinition) -> Labels {
    let mut labels = Labels::new();
    insert(&mut labels, "__name__", metric);
    insert(&mut labels, "group_id", &incident.id);
    insert(&mut labels, "component", incident.alert_component(alert));
    insert(&mut labels, "layer", incident.layer.as_str());
    insert(&mut labels, "src_alertname", &alert.name);
    insert(&mut labels, "src_namespace", &alert.namespace);
    insert(&mut labels, "src_severity", alert.severity.as_str());
    insert(&mut labels, "type", "alert");
    insert(&mut labels, "silenced", if alert.silenced { "true" } else { "false" });
    infra_labels(&mut labels, incident);
    labels
}

fn alert_labels(incident: &IncidentDefinition, alert: &AlertDefinition) -> Labels {
    let mut labels = Labels::new();
    insert(&mut labels, "__name__", ALERTS_METRIC);
    insert(&mut labels, "alertname", &alert.name);
    insert(&mut labels, "alertstate", "firing");
    insert(&mut labels, "namespace", &alert.namespace);
    insert(&mut labels, "severity", alert.severity.as_str());
    insert(&mut labels, "component", incident.alert_component(alert));
    insert(&mut labels, "silenced", if alert.silenced { "true" } else { "false" });
    infra_labels(&mut labels, incident);
    labels
}

/// Incident × alert pairs selected by the health metric's `group_id` matchers.
fn health_pairs<'a>(
    definitions: &'a [IncidentDefinition],
    filter: &'a LabelFilter,
) -> impl Iterator<Item = (&'a IncidentDefinition, &'a AlertDefinition)> + 'a {
    definitions
        .iter()
        .filter(move |incident| filter.allows("group_id", &incident.id))
        .flat_map(|incident| incident.alerts.iter().map(move |alert| (incident, alert)))
}

/// Incident × alert pairs selected by `alertname` and `namespace` matchers.
fn alert_pairs<'a>(
    definitions: &'a [IncidentDefinition],
    filter: &'a LabelFilter,
) -> impl Iterator<Item = (&'a IncidentDefinition, &'a AlertDefinition)> + 'a {
    definitions
        .iter()
        .flat_map(|incident| incident.alerts.iter().map(move |alert| (incident, alert)))
        .filter(move |(_, alert)| {
            filter.allows("alertname", &alert.name) && filter.allows("namespace", &alert.namespace)
        })
}

/// Range results for the health components metric, one series per alert.
pub fn build_incident_matrix(
    definitions: &[IncidentDefinition],
    query: &str,
    window: QueryWindow,
    now: i64,
) -> Vec<PrometheusResult> {
    let metric = health_metric_name(query);
    let filter = LabelFilter::from_query(query);
    health_pairs(definitions, &filter)
        .filter_map(|(incident, alert)| {
            let timeline = incident.alert_timeline(alert, now);
            let values = generate_values(&timeline, window, alert.severity, MetricFamily::Health, now);
            (!values.is_empty()).then(|| PrometheusResult {
                metric: health_labels(metric, incident, alert),
                values,
            })
        })
        .collect()
}

/// Range results for `ALERTS`, one series per alert.
pub fn build_alert_matrix(
    definitions: &[IncidentDefinition],
    query: &str,
    window: QueryWindow,
    now: i64,
) -> Vec<PrometheusResult> {
    let filter = LabelFilter::from_query(query);
    alert_pairs(definitions, &filter)
        .filter_map(|(incident, alert)| {
            let timeline = incident.alert_timeline(alert, now);
            let values = generate_values(&timeline, window, alert.severity, MetricFamily::Alerts, now);
            (!values.is_empty()).then(|| PrometheusResult {
                metric: alert_labels(incident, alert),
                values,
            })
        })
        .collect()
}

/// Absolute start of every selected series, stamped at `eval_time`. Independent
/// of any range window so the value never changes with the UI's day filter.
pub fn build_instant_vector(
    definitions: &[IncidentDefinition],
    query: &str,
    family: MetricFamily,
    now: i64,
    eval_time: i64,
) -> Vec<PrometheusInstantResult> {
    let filter = LabelFilter::from_query(query);
    let instant = |incident: &IncidentDefinition, alert: &AlertDefinition, metric: Labels| {
        let start = incident.alert_timeline(alert, now).start;
        PrometheusInstantResult {
            metric,
            value: (eval_time, start.to_string()),
        }
    };
    match family {
        MetricFamily::Health => {
            let metric = health_metric_name(query);
            health_pairs(definitions, &filter)
                .map(|(incident, alert)| {
                    instant(incident, alert, health_labels(metric, incident, alert))
                })
                .collect()
        }
        MetricFamily::Alerts => alert_pairs(definitions, &filter)
            .map(|(incident, alert)| instant(incident, alert, alert_labels(incident, alert)))
            .collect(),
    }
}
