//! Version registry notification.

use shipyard_config::Manifest;

use crate::error::EngineError;

/// The JSON body posted to the registry.
fn payload(name: &str, version: &str) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "version": version,
    })
}

/// Notify the registry that `version`'s artifacts are available.
///
/// One outbound POST; there is nothing to roll back on failure, but the
/// failure is surfaced, never swallowed.
///
/// # Errors
/// Returns an error if no registry URL is configured, or the request fails
/// or returns a non-success status.
pub fn update_registry(manifest: &Manifest, version: &str) -> Result<(), EngineError> {
    let url = manifest.registry_url()?;

    eprintln!("    Updating registry {url} \u{2192} {version}");

    let agent = ureq::Agent::new_with_config(
        ureq::config::Config::builder()
            .timeout_connect(Some(std::time::Duration::from_secs(30)))
            .timeout_global(Some(std::time::Duration::from_secs(120)))
            .build(),
    );

    let body = payload(&manifest.project.name, version);
    match agent.post(url).send_json(&body) {
        Ok(response) if response.status().is_success() => Ok(()),
        Ok(response) => Err(EngineError::RegistryUpdateFailed {
            url: url.to_owned(),
            message: format!("registry returned status {}", response.status()),
        }),
        Err(e) => Err(EngineError::RegistryUpdateFailed {
            url: url.to_owned(),
            message: e.to_string(),
        }),
    }
}
