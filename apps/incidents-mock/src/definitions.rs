use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashSet;

use crate::error::MockError;

/// Incidents without a timeline are treated as started this long ago and still firing.
pub const DEFAULT_INCIDENT_AGE_SECONDS: i64 = 7 * 86_400;

const REQUIRED_INCIDENT_FIELDS: [&str; 4] = ["id", "component", "layer", "alerts"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }

    /// Value exported by the health components metric.
    pub fn rank(self) -> u8 {
        match self {
            Self::Critical => 2,
            Self::Warning => 1,
            Self::Info => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layer {
    #[serde(rename = "core")]
    Core,
    #[serde(rename = "Others")]
    Others,
}

impl Layer {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Others => "Others",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityChange {
    pub timestamp: i64,
    pub severity: Severity,
}

/// Absolute timeline of a series, in Unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentTimeline {
    pub start: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub severity_changes: Vec<SeverityChange>,
}

impl IncidentTimeline {
    pub fn ongoing_since(start: i64) -> Self {
        Self {
            start,
            end: None,
            severity_changes: Vec::new(),
        }
    }

    pub fn is_ongoing(&self) -> bool {
        self.end.is_none()
    }

    fn check_range(&self) -> Result<(), String> {
        if self.start < 0 {
            return Err(format!("start {} is before the Unix epoch", self.start));
        }
        if let Some(end) = self.end {
            if end < self.start {
                return Err(format!("end {end} is before start {}", self.start));
            }
        }
        match self.severity_changes.iter().find(|change| change.timestamp < 0) {
            Some(change) => Err(format!(
                "severity change at {} is before the Unix epoch",
                change.timestamp
            )),
            None => Ok(()),
        }
    }

    /// Severity in effect at `timestamp`: the latest change at or before it,
    /// regardless of declaration order, else `base`.
    pub fn severity_at(&self, timestamp: i64, base: Severity) -> Severity {
        self.severity_changes
            .iter()
            .filter(|change| change.timestamp <= timestamp)
            .max_by_key(|change| change.timestamp)
            .map(|change| change.severity)
            .unwrap_or(base)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertDefinition {
    pub name: String,
    pub namespace: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default)]
    pub silenced: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline: Option<IncidentTimeline>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentDefinition {
    pub id: String,
    pub component: String,
    pub layer: Layer,
    pub alerts: Vec<AlertDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline: Option<IncidentTimeline>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_cluster: Option<String>,
}

impl IncidentDefinition {
    /// The incident's own timeline, or the seven-day ongoing default.
    pub fn incident_timeline(&self, now: i64) -> IncidentTimeline {
        self.timeline
            .clone()
            .unwrap_or_else(|| IncidentTimeline::ongoing_since(now - DEFAULT_INCIDENT_AGE_SECONDS))
    }

    /// Timeline driving one alert's series; alerts without one inherit the incident's.
    pub fn alert_timeline(&self, alert: &AlertDefinition, now: i64) -> IncidentTimeline {
        match &alert.timeline {
            Some(timeline) => timeline.clone(),
            None => self.incident_timeline(now),
        }
    }

    pub fn alert_component<'a>(&'a self, alert: &'a AlertDefinition) -> &'a str {
        alert.component.as_deref().unwrap_or(&self.component)
    }
}

/// Decodes a programmatic definition list, reporting the first incident that
/// lacks a required field by index before attempting typed decoding.
pub fn definitions_from_json(value: JsonValue) -> Result<Vec<IncidentDefinition>, MockError> {
    let items = value.as_array().ok_or_else(|| {
        MockError::InvalidDefinitions("expected a JSON array of incidents".to_string())
    })?;

    for (index, item) in items.iter().enumerate() {
        let Some(object) = item.as_object() else {
            return Err(MockError::InvalidDefinitions(format!(
                "incident at index {index} must be an object"
            )));
        };
        let missing: Vec<String> = REQUIRED_INCIDENT_FIELDS
            .iter()
            .filter(|field| object.get(**field).map_or(true, JsonValue::is_null))
            .map(|field| field.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(MockError::MissingIncidentFields {
                index,
                fields: missing,
            });
        }
    }

    let definitions: Vec<IncidentDefinition> = serde_json::from_value(value)
        .map_err(|err| MockError::InvalidDefinitions(err.to_string()))?;
    ensure_unique_ids(&definitions)?;
    ensure_timelines_in_range(&definitions)?;
    Ok(definitions)
}

/// Rejects timelines that start before the epoch or end before they start.
pub fn ensure_timelines_in_range(definitions: &[IncidentDefinition]) -> Result<(), MockError> {
    for (index, incident) in definitions.iter().enumerate() {
        if let Some(timeline) = &incident.timeline {
            timeline.check_range().map_err(|reason| {
                MockError::InvalidDefinitions(format!("incident at index {index}: {reason}"))
            })?;
        }
        for alert in &incident.alerts {
            if let Some(timeline) = &alert.timeline {
                timeline.check_range().map_err(|reason| {
                    MockError::InvalidDefinitions(format!(
                        "incident at index {index}, alert {:?}: {reason}",
                        alert.name
                    ))
                })?;
            }
        }
    }
    Ok(())
}

pub fn ensure_unique_ids(definitions: &[IncidentDefinition]) -> Result<(), MockError> {
    let mut seen = HashSet::new();
    for (index, incident) in definitions.iter().enumerate() {
        if !seen.insert(incident.id.as_str()) {
            return Err(MockError::InvalidDefinitions(format!(
                "incident at index {index} reuses id {:?}",
                incident.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn severity_resolution_ignores_declaration_order() {
        let timeline = IncidentTimeline {
            start: 0,
            end: None,
            severity_changes: vec![
                SeverityChange {
                    timestamp: 2_000,
                    severity: Severity::Warning,
                },
                SeverityChange {
                    timestamp: 1_000,
                    severity: Severity::Critical,
                },
            ],
        };
        assert_eq!(timeline.severity_at(999, Severity::Info), Severity::Info);
        assert_eq!(timeline.severity_at(1_000, Severity::Info), Severity::Critical);
        assert_eq!(timeline.severity_at(1_999, Severity::Info), Severity::Critical);
        assert_eq!(timeline.severity_at(2_000, Severity::Info), Severity::Warning);
        assert_eq!(timeline.severity_at(9_999, Severity::Info), Severity::Warning);
    }

    #[test]
    fn alert_inherits_incident_timeline_or_default() {
        let now = 1_000_000;
        let mut incident = IncidentDefinition {
            id: "INC-1".to_string(),
            component: "etcd".to_string(),
            layer: Layer::Core,
            alerts: vec![AlertDefinition {
                name: "EtcdDown".to_string(),
                namespace: "openshift-etcd".to_string(),
                severity: Severity::Critical,
                component: None,
                silenced: false,
                timeline: None,
            }],
            timeline: None,
            managed_cluster: None,
        };
        let alert = incident.alerts[0].clone();
        assert_eq!(
            incident.alert_timeline(&alert, now),
            IncidentTimeline::ongoing_since(now - DEFAULT_INCIDENT_AGE_SECONDS)
        );

        incident.timeline = Some(IncidentTimeline::ongoing_since(now - 60));
        assert_eq!(incident.alert_timeline(&alert, now).start, now - 60);
        assert_eq!(incident.alert_component(&alert), "etcd");
    }

    #[test]
    fn programmatic_definitions_report_missing_fields_by_index() {
        let value = json!([
            {"id": "a", "component": "c", "layer": "core", "alerts": []},
            {"id": "b", "layer": "Others"}
        ]);
        let err = definitions_from_json(value).unwrap_err();
        match err {
            MockError::MissingIncidentFields { index, fields } => {
                assert_eq!(index, 1);
                assert_eq!(fields, vec!["component".to_string(), "alerts".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn programmatic_definitions_decode_absolute_timelines() {
        let value = json!([{
            "id": "INC-7",
            "component": "network",
            "layer": "Others",
            "managed_cluster": "spoke-1",
            "timeline": {"start": 100, "end": 900, "severityChanges": [{"timestamp": 500, "severity": "warning"}]},
            "alerts": [{"name": "NodeNetworkDown", "namespace": "openshift-sdn", "severity": "critical", "silenced": true}]
        }]);
        let definitions = definitions_from_json(value).unwrap();
        assert_eq!(definitions.len(), 1);
        let incident = &definitions[0];
        assert_eq!(incident.layer, Layer::Others);
        assert_eq!(incident.managed_cluster.as_deref(), Some("spoke-1"));
        let timeline = incident.timeline.as_ref().unwrap();
        assert_eq!(timeline.end, Some(900));
        assert_eq!(timeline.severity_changes[0].severity, Severity::Warning);
        assert!(incident.alerts[0].silenced);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let value = json!([
            {"id": "a", "component": "c", "layer": "core", "alerts": []},
            {"id": "a", "component": "d", "layer": "core", "alerts": []}
        ]);
        let err = definitions_from_json(value).unwrap_err();
        assert!(err.to_string().contains("index 1"));
    }

    #[test]
    fn timelines_out_of_range_are_rejected() {
        let before_epoch = json!([{
            "id": "a", "component": "c", "layer": "core",
            "timeline": {"start": i64::MIN},
            "alerts": []
        }]);
        let err = definitions_from_json(before_epoch).unwrap_err();
        assert!(err.to_string().contains("before the Unix epoch"), "{err}");

        let inverted = json!([{
            "id": "a", "component": "c", "layer": "core",
            "alerts": [{"name": "A", "namespace": "n", "severity": "info",
                        "timeline": {"start": 900, "end": 100}}]
        }]);
        let err = definitions_from_json(inverted).unwrap_err();
        assert!(err.to_string().contains("end 100 is before start 900"), "{err}");

        let negative_change = json!([{
            "id": "a", "component": "c", "layer": "core",
            "timeline": {"start": 0, "severityChanges": [{"timestamp": -5, "severity": "warning"}]},
            "alerts": []
        }]);
        assert!(matches!(
            definitions_from_json(negative_change),
            Err(MockError::InvalidDefinitions(_))
        ));
    }

    #[test]
    fn non_array_payload_is_rejected() {
        let err = definitions_from_json(json!({"id": "a"})).unwrap_err();
        assert!(matches!(err, MockError::InvalidDefinitions(_)));
    }
}
