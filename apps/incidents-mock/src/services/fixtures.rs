//! Human-authored incident scenarios and their conversion into runtime definitions.
//!
//! Every temporal field in a fixture is a duration measured backwards from the
//! installation's "now" (`start: "2h"` means two hours ago).

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::Path;

use crate::definitions::{
    ensure_timelines_in_range, ensure_unique_ids, AlertDefinition, IncidentDefinition, Layer,
    Severity,
};
use crate::error::MockError;
use crate::services::schema::validate_fixture;
use crate::services::timeline::materialize_timeline;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityChangeFixture {
    pub time: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineFixture {
    pub start: String,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub severity_changes: Vec<SeverityChangeFixture>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertFixture {
    pub name: String,
    pub namespace: String,
    pub severity: Severity,
    #[serde(default)]
    pub component: Option<String>,
    #[serde(default)]
    pub silenced: Option<bool>,
    #[serde(default)]
    pub timeline: Option<TimelineFixture>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentFixture {
    pub id: String,
    pub component: String,
    pub layer: Layer,
    #[serde(default)]
    pub timeline: Option<TimelineFixture>,
    #[serde(default)]
    pub managed_cluster: Option<String>,
    pub alerts: Vec<AlertFixture>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentScenarioFixture {
    pub name: String,
    pub description: String,
    pub incidents: Vec<IncidentFixture>,
}

/// Parses YAML (or JSON, which YAML accepts) into an untyped document.
pub fn parse_fixture_document(text: &str) -> Result<JsonValue, MockError> {
    serde_yaml::from_str::<JsonValue>(text).map_err(|err| MockError::FixtureParse(err.to_string()))
}

/// Drops `null` object entries so an explicit `~` reads the same as an absent key.
fn strip_nulls(value: &mut JsonValue) {
    match value {
        JsonValue::Object(map) => {
            map.retain(|_, entry| !entry.is_null());
            map.values_mut().for_each(strip_nulls);
        }
        JsonValue::Array(items) => items.iter_mut().for_each(strip_nulls),
        _ => {}
    }
}

/// Validates then decodes a fixture document.
pub fn fixture_from_document(mut document: JsonValue) -> Result<IncidentScenarioFixture, MockError> {
    strip_nulls(&mut document);
    validate_fixture(&document).map_err(MockError::SchemaValidation)?;
    serde_json::from_value(document).map_err(|err| MockError::FixtureParse(err.to_string()))
}

pub fn parse_fixture(text: &str) -> Result<IncidentScenarioFixture, MockError> {
    fixture_from_document(parse_fixture_document(text)?)
}

pub fn load_fixture_file(path: &Path) -> Result<IncidentScenarioFixture, MockError> {
    let text = std::fs::read_to_string(path)
        .map_err(|err| MockError::FixtureParse(format!("{}: {err}", path.display())))?;
    parse_fixture(&text)
}

/// Converts a validated scenario into runtime definitions anchored to `now`.
/// The same fixture and `now` always produce the same definitions.
pub fn convert_fixture(
    fixture: &IncidentScenarioFixture,
    now: i64,
) -> Result<Vec<IncidentDefinition>, MockError> {
    let definitions = fixture
        .incidents
        .iter()
        .map(|incident| convert_incident(incident, now))
        .collect::<Result<Vec<_>, MockError>>()?;
    ensure_unique_ids(&definitions)?;
    ensure_timelines_in_range(&definitions)?;
    Ok(definitions)
}

fn convert_incident(incident: &IncidentFixture, now: i64) -> Result<IncidentDefinition, MockError> {
    let alerts = incident
        .alerts
        .iter()
        .map(|alert| {
            Ok(AlertDefinition {
                name: alert.name.clone(),
                namespace: alert.namespace.clone(),
                severity: alert.severity,
                component: alert.component.clone(),
                silenced: alert.silenced.unwrap_or(false),
                timeline: materialize_timeline(alert.timeline.as_ref(), now)?,
            })
        })
        .collect::<Result<Vec<_>, MockError>>()?;

    Ok(IncidentDefinition {
        id: incident.id.clone(),
        component: incident.component.clone(),
        layer: incident.layer,
        alerts,
        timeline: materialize_timeline(incident.timeline.as_ref(), now)?,
        managed_cluster: incident.managed_cluster.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const NOW: i64 = 1_700_000_000;

    const SCENARIO: &str = r#"
name: mixed severities
description: one core incident escalating, one resolved network incident
incidents:
  - id: INC-1
    component: etcd
    layer: core
    timeline:
      start: 2h
      severityChanges:
        - time: 2h
          severity: warning
        - time: 30m
          severity: critical
    alerts:
      - name: EtcdMembersDown
        namespace: openshift-etcd
        severity: critical
      - name: EtcdHighFsyncDurations
        namespace: openshift-etcd
        severity: warning
        component: storage
        silenced: true
        timeline:
          start: 1h
          end: 15m
  - id: INC-2
    component: network
    layer: Others
    managed_cluster: spoke-a
    alerts:
      - name: NodeNetworkInterfaceFlapping
        namespace: openshift-monitoring
        severity: info
"#;

    #[test]
    fn converts_yaml_scenarios_into_absolute_definitions() {
        let fixture = parse_fixture(SCENARIO).unwrap();
        assert_eq!(fixture.incidents.len(), 2);

        let definitions = convert_fixture(&fixture, NOW).unwrap();
        let first = &definitions[0];
        assert_eq!(first.id, "INC-1");
        assert_eq!(first.layer, Layer::Core);
        let timeline = first.timeline.as_ref().unwrap();
        assert_eq!(timeline.start, NOW - 7_200);
        assert!(timeline.is_ongoing());
        assert_eq!(timeline.severity_changes[1].timestamp, NOW - 1_800);

        assert!(first.alerts[0].timeline.is_none());
        assert!(!first.alerts[0].silenced);
        let second_alert = &first.alerts[1];
        assert!(second_alert.silenced);
        assert_eq!(second_alert.component.as_deref(), Some("storage"));
        let alert_timeline = second_alert.timeline.as_ref().unwrap();
        assert_eq!((alert_timeline.start, alert_timeline.end), (NOW - 3_600, Some(NOW - 900)));

        let second = &definitions[1];
        assert_eq!(second.layer, Layer::Others);
        assert_eq!(second.managed_cluster.as_deref(), Some("spoke-a"));
        assert!(second.timeline.is_none());
    }

    #[test]
    fn conversion_is_repeatable_for_the_same_now() {
        let fixture = parse_fixture(SCENARIO).unwrap();
        assert_eq!(
            convert_fixture(&fixture, NOW).unwrap(),
            convert_fixture(&fixture, NOW).unwrap()
        );
    }

    #[test]
    fn json_documents_are_accepted() {
        let text = r#"{"name": "n", "description": "d", "incidents": [
            {"id": "INC-9", "component": "c", "layer": "core",
             "alerts": [{"name": "A", "namespace": "ns", "severity": "info"}]}
        ]}"#;
        let fixture = parse_fixture(text).unwrap();
        assert_eq!(fixture.incidents[0].alerts[0].severity, Severity::Info);
    }

    #[test]
    fn schema_failures_carry_every_error() {
        let text = r#"
name: broken
description: missing pieces
incidents:
  - layer: core
    alerts:
      - name: A
        namespace: ns
        severity: severe
"#;
        let err = parse_fixture(text).unwrap_err();
        let MockError::SchemaValidation(errors) = &err else {
            panic!("unexpected error: {err:?}");
        };
        assert!(errors.len() >= 3, "{errors:#?}");
        assert!(errors
            .iter()
            .any(|e| e.starts_with("/incidents/0: ") && e.contains("\"id\"")));
        assert!(errors
            .iter()
            .any(|e| e.starts_with("/incidents/0/alerts/0/severity: ") && e.contains("\"severe\"")));
        assert!(err.to_string().starts_with("fixture failed schema validation:\n"));
    }

    #[test]
    fn explicit_nulls_read_as_absent_fields() {
        let text = r#"
name: nulls
description: optional fields spelled out as null
incidents:
  - id: INC-3
    component: api
    layer: core
    managed_cluster: ~
    timeline: ~
    alerts:
      - name: KubeAPIDown
        namespace: openshift-kube-apiserver
        severity: critical
        component: null
        silenced: ~
        timeline:
          start: 1h
          end: ~
          severityChanges: ~
"#;
        let fixture = parse_fixture(text).unwrap();
        let incident = &fixture.incidents[0];
        assert_eq!(incident.managed_cluster, None);
        assert_eq!(incident.timeline, None);
        let alert = &incident.alerts[0];
        assert_eq!((alert.component.as_deref(), alert.silenced), (None, None));
        let timeline = alert.timeline.as_ref().unwrap();
        assert_eq!(timeline.end, None);
        assert!(timeline.severity_changes.is_empty());
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = parse_fixture("name: [unterminated").unwrap_err();
        assert!(matches!(err, MockError::FixtureParse(_)));
    }

    #[test]
    fn duplicate_incident_ids_are_rejected() {
        let text = r#"
name: dupes
description: two incidents share an id
incidents:
  - {id: X, component: c, layer: core, alerts: [{name: A, namespace: n, severity: info}]}
  - {id: X, component: c, layer: core, alerts: [{name: B, namespace: n, severity: info}]}
"#;
        let fixture = parse_fixture(text).unwrap();
        assert!(matches!(
            convert_fixture(&fixture, NOW),
            Err(MockError::InvalidDefinitions(_))
        ));
    }

    #[test]
    fn durations_reaching_before_the_epoch_are_rejected() {
        let text = r#"
name: ancient
description: starts long before 1970
incidents:
  - {id: OLD, component: c, layer: core, timeline: {start: 999999999d},
     alerts: [{name: A, namespace: n, severity: info}]}
"#;
        let fixture = parse_fixture(text).unwrap();
        let err = convert_fixture(&fixture, NOW).unwrap_err();
        assert!(err.to_string().contains("before the Unix epoch"), "{err}");
    }

    #[test]
    fn bundled_fixture_is_valid() {
        let fixture = parse_fixture(include_str!("../../fixtures/mixed-incidents.yaml")).unwrap();
        let definitions = convert_fixture(&fixture, NOW).unwrap();
        assert_eq!(definitions.len(), 3);
        let blip = &definitions[2].alerts[0];
        let timeline = blip.timeline.as_ref().unwrap();
        assert_eq!(timeline.end.unwrap() - timeline.start, 120);
    }

    #[test]
    fn loads_fixtures_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SCENARIO.as_bytes()).unwrap();
        let fixture = load_fixture_file(file.path()).unwrap();
        assert_eq!(fixture.name, "mixed severities");

        let missing = load_fixture_file(Path::new("/nonexistent/fixture.yaml")).unwrap_err();
        assert!(missing.to_string().contains("/nonexistent/fixture.yaml"));
    }
}
