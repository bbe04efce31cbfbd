//! JSON Schema validation of incident fixture documents.
//!
//! The schema ships next to the bundled fixtures and is compiled once. Every
//! violation is reported as `<instance path>: <message>` so authors see all
//! problems at once.

use jsonschema::Validator;
use serde_json::Value as JsonValue;
use std::sync::LazyLock;

pub const FIXTURE_SCHEMA_SOURCE: &str = include_str!("../../fixtures/incident-fixture.schema.json");

static FIXTURE_SCHEMA: LazyLock<Result<Validator, String>> = LazyLock::new(|| {
    let schema: JsonValue =
        serde_json::from_str(FIXTURE_SCHEMA_SOURCE).map_err(|err| err.to_string())?;
    jsonschema::validator_for(&schema).map_err(|err| err.to_string())
});

/// Checks `document` against the fixture schema. `Err` carries every violation found.
pub fn validate_fixture(document: &JsonValue) -> Result<(), Vec<String>> {
    let validator = FIXTURE_SCHEMA
        .as_ref()
        .map_err(|err| vec![format!("/: fixture schema failed to compile: {err}")])?;

    let errors: Vec<String> = validator
        .iter_errors(document)
        .map(|error| {
            let path = error.instance_path.to_string();
            let path = if path.is_empty() { "/".to_string() } else { path };
            format!("{path}: {error}")
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
