//! Deployment manifest rendering: patch the Deployment document's container
//! image and arguments, preserve everything else.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use serde_yaml::Value;

use crate::error::EngineError;

/// The cloud providers a deployment can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudProvider {
    Gce,
    Gke,
    Aws,
    Azure,
    Minikube,
    Baremetal,
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CloudProvider::Gce => "gce",
            CloudProvider::Gke => "gke",
            CloudProvider::Aws => "aws",
            CloudProvider::Azure => "azure",
            CloudProvider::Minikube => "minikube",
            CloudProvider::Baremetal => "baremetal",
        };
        f.write_str(name)
    }
}

impl FromStr for CloudProvider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gce" => Ok(CloudProvider::Gce),
            "gke" => Ok(CloudProvider::Gke),
            "aws" => Ok(CloudProvider::Aws),
            "azure" => Ok(CloudProvider::Azure),
            "minikube" => Ok(CloudProvider::Minikube),
            "baremetal" => Ok(CloudProvider::Baremetal),
            other => Err(UnknownProvider {
                name: other.to_owned(),
            }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown cloud provider \"{name}\" — expected one of: gce, gke, aws, azure, minikube, baremetal")]
pub struct UnknownProvider {
    pub name: String,
}

/// What the renderer did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSummary {
    /// How many documents the template contained.
    pub documents: usize,
    /// Whether a Deployment document was found and patched.
    pub patched: bool,
}

/// Render the deployment template at `template_path` to `out_path`.
///
/// The template is parsed as a multi-document YAML sequence, order
/// preserved. In the first document whose `kind` is `Deployment`, the first
/// container of the pod template gets its `image` replaced with
/// `<image>:<version>` and its `args` with the fixed run command for
/// `provider`. Every other document round-trips structurally unchanged.
///
/// A template with no Deployment document renders as a pass-through copy;
/// that is almost certainly unintended, so a warning is printed.
///
/// # Errors
/// Returns `ManifestMalformed` if the template cannot be read, contains no
/// parseable documents, or its Deployment document lacks
/// `spec.template.spec.containers[0]`. Returns an I/O error if the output
/// cannot be written.
pub fn render_deployment(
    template_path: &Path,
    image: &str,
    version: &str,
    provider: CloudProvider,
    out_path: &Path,
) -> Result<RenderSummary, EngineError> {
    let template = template_path.display().to_string();
    let content = std::fs::read_to_string(template_path).map_err(|e| {
        EngineError::ManifestMalformed {
            path: template.clone(),
            message: e.to_string(),
        }
    })?;

    let mut docs = Vec::new();
    for de in serde_yaml::Deserializer::from_str(&content) {
        let doc = Value::deserialize(de).map_err(|e| EngineError::ManifestMalformed {
            path: template.clone(),
            message: e.to_string(),
        })?;
        docs.push(doc);
    }
    // An empty stream parses as zero documents (or one null document,
    // depending on the trailing-newline shape) — either way there is
    // nothing to render.
    if docs.is_empty() || docs.iter().all(Value::is_null) {
        return Err(EngineError::ManifestMalformed {
            path: template,
            message: "no documents found".to_owned(),
        });
    }

    let mut patched = false;
    for doc in &mut docs {
        if doc.get("kind").and_then(Value::as_str) != Some("Deployment") {
            continue;
        }
        let Some(container) = first_container_mut(doc) else {
            return Err(EngineError::ManifestMalformed {
                path: template,
                message: "Deployment document has no spec.template.spec.containers[0]".to_owned(),
            });
        };
        let Some(mapping) = container.as_mapping_mut() else {
            return Err(EngineError::ManifestMalformed {
                path: template,
                message: "Deployment container is not a mapping".to_owned(),
            });
        };

        mapping.insert(
            Value::from("image"),
            Value::from(format!("{image}:{version}")),
        );
        mapping.insert(
            Value::from("args"),
            Value::Sequence(vec![
                Value::from("run"),
                Value::from(format!("--cloud-provider={provider}")),
                Value::from("--v=5"),
                Value::from("--analytics=false"),
            ]),
        );
        patched = true;
        break;
    }

    if !patched {
        eprintln!(
            "warning: no Deployment document in {} — output is an unmodified copy",
            template
        );
    }

    let mut rendered = String::new();
    for doc in &docs {
        let text = serde_yaml::to_string(doc).map_err(|e| EngineError::ManifestMalformed {
            path: template.clone(),
            message: e.to_string(),
        })?;
        if !rendered.is_empty() {
            rendered.push_str("---\n");
        }
        rendered.push_str(&text);
    }

    if let Some(parent) = out_path.parent() {
        shipyard_util::fs::ensure_dir(parent)?;
    }
    std::fs::write(out_path, rendered).map_err(|source| EngineError::Io {
        path: out_path.display().to_string(),
        source,
    })?;

    Ok(RenderSummary {
        documents: docs.len(),
        patched,
    })
}

/// `spec.template.spec.containers[0]` of a Deployment document.
fn first_container_mut(doc: &mut Value) -> Option<&mut Value> {
    doc.get_mut("spec")?
        .get_mut("template")?
        .get_mut("spec")?
        .get_mut("containers")?
        .get_mut(0)
}
