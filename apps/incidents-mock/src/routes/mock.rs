use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, put};
use axum::{Json, Router};
use std::path::Path;

use crate::definitions::definitions_from_json;
use crate::error::{AppResult, MockError};
use crate::services::fixtures::{load_fixture_file, parse_fixture};
use crate::services::interception::MockInstallation;
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct InstallationSummary {
    pub installed: usize,
    pub alerts: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub now: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl InstallationSummary {
    fn empty() -> Self {
        Self {
            installed: 0,
            alerts: 0,
            now: None,
            source: None,
        }
    }

    fn of(installation: &MockInstallation) -> Self {
        Self {
            installed: installation.definitions.len(),
            alerts: installation.alert_count(),
            now: Some(installation.now),
            source: Some(installation.source.clone()),
        }
    }
}

async fn activate(state: &AppState, installation: MockInstallation) -> InstallationSummary {
    let summary = InstallationSummary::of(&installation);
    let replaced = state.install(installation).await;
    tracing::info!(
        fixture = summary.source.as_deref().unwrap_or_default(),
        incidents = summary.installed,
        alerts = summary.alerts,
        now = summary.now.unwrap_or_default(),
        replaced = replaced.is_some(),
        "mock installed"
    );
    summary
}

/// Loads, validates and installs a fixture file. Nothing is installed on error.
pub async fn install_fixture_path(
    state: &AppState,
    path: &Path,
) -> Result<InstallationSummary, MockError> {
    let fixture = load_fixture_file(path)?;
    let installation = MockInstallation::from_fixture(&fixture, &state.clock)?;
    Ok(activate(state, installation).await)
}

async fn put_fixture(
    State(state): State<AppState>,
    body: String,
) -> AppResult<Json<InstallationSummary>> {
    let fixture = parse_fixture(&body)?;
    let installation = MockInstallation::from_fixture(&fixture, &state.clock)?;
    Ok(Json(activate(&state, installation).await))
}

async fn put_incidents(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<InstallationSummary>> {
    let value: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|err| MockError::InvalidDefinitions(err.to_string()))?;
    let definitions = definitions_from_json(value)?;
    let installation = MockInstallation::from_definitions(definitions, &state.clock);
    Ok(Json(activate(&state, installation).await))
}

async fn get_mock(State(state): State<AppState>) -> Json<InstallationSummary> {
    Json(
        state
            .installation()
            .await
            .map(|installation| InstallationSummary::of(&installation))
            .unwrap_or_else(InstallationSummary::empty),
    )
}

async fn delete_mock(State(state): State<AppState>) -> Json<InstallationSummary> {
    let removed = state.teardown().await;
    if let Some(installation) = &removed {
        tracing::info!(fixture = %installation.source, "mock torn down");
    }
    Json(InstallationSummary::empty())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/mock", get(get_mock).delete(delete_mock))
        .route("/mock/fixture", put(put_fixture))
        .route("/mock/incidents", put(put_incidents))
}
