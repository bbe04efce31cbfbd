use crate::config::MockConfig;
use crate::definitions::{AlertDefinition, IncidentDefinition, IncidentTimeline, Layer, Severity};
use crate::services::interception::MockInstallation;
use crate::state::AppState;
use crate::time::Clock;

pub const NOW: i64 = 1_700_000_000;

/// INC-1: core etcd incident, ongoing for 2h, one critical alert inheriting it.
/// INC-2: resolved network incident on a managed cluster, alert active from 4h to 1h ago.
pub fn sample_definitions() -> Vec<IncidentDefinition> {
    vec![
        IncidentDefinition {
            id: "INC-1".to_string(),
            component: "etcd".to_string(),
            layer: Layer::Core,
            alerts: vec![AlertDefinition {
                name: "EtcdMembersDown".to_string(),
                namespace: "openshift-etcd".to_string(),
                severity: Severity::Critical,
                component: None,
                silenced: false,
                timeline: None,
            }],
            timeline: Some(IncidentTimeline::ongoing_since(NOW - 2 * 3_600)),
            managed_cluster: None,
        },
        IncidentDefinition {
            id: "INC-2".to_string(),
            component: "network".to_string(),
            layer: Layer::Others,
            alerts: vec![AlertDefinition {
                name: "KubeNodeNotReady".to_string(),
                namespace: "openshift-monitoring".to_string(),
                severity: Severity::Warning,
                component: Some("compute".to_string()),
                silenced: true,
                timeline: Some(IncidentTimeline {
                    start: NOW - 4 * 3_600,
                    end: Some(NOW - 3_600),
                    severity_changes: Vec::new(),
                }),
            }],
            timeline: None,
            managed_cluster: Some("spoke-a".to_string()),
        },
    ]
}

pub fn sample_installation() -> MockInstallation {
    MockInstallation::from_definitions(sample_definitions(), &Clock::fixed(NOW))
}

pub fn test_config() -> MockConfig {
    MockConfig {
        fixed_now: Some(NOW),
        ..MockConfig::default()
    }
}

pub fn test_state() -> AppState {
    AppState::new(test_config(), Clock::fixed(NOW), reqwest::Client::new())
}
