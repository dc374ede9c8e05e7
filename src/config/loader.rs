// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::model::{RawScenarioFile, ScenarioFile};
use crate::errors::Result;

/// Read a scenario file and deserialize it without semantic checks.
///
/// Use [`load_and_validate`] for anything that is going to run.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawScenarioFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    load_from_str(&contents)
}

pub fn load_from_str(contents: &str) -> Result<RawScenarioFile> {
    let raw: RawScenarioFile = toml::from_str(contents)?;
    Ok(raw)
}

/// Load a scenario file and validate it.
///
/// - Reads TOML and applies defaults (`serde` + `Default` impls).
/// - Parses every duration and checks the `[config]` values.
/// - Checks test and trigger names and trigger parameters.
/// - Resolves model keyframes.
///
/// Expectation syntax is *not* checked here; a malformed expectation
/// fails its trigger at run time.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ScenarioFile> {
    let path = path.as_ref();
    let raw = load_from_path(path)?;
    let scenario = ScenarioFile::try_from(raw)?;
    debug!(
        path = %path.display(),
        tests = scenario.tests.len(),
        models = scenario.models.len(),
        "scenario loaded"
    );
    Ok(scenario)
}
