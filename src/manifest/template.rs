//! YAML template renderer
//!
//! Replaces every `${KEY}` placeholder in a YAML template with its value and
//! parses the result. Built-in templates ship inside the binary; a template
//! directory, when configured, takes precedence file by file.
//!
//! A placeholder written as a whole double-quoted scalar (`"${KEY}"`) is
//! replaced by the value as an escaped YAML string, so any text is safe there.
//! A bare placeholder (`port: ${PORT}`) receives the value verbatim and is
//! meant for numbers and JSON built by this crate.

use crate::domain::ports::{ManifestBuilder, TemplateId};
use crate::error::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const MASTER_DEPLOYMENT: &str = include_str!("../../templates/spark_master_deployment.yaml");
const MASTER_SERVICE: &str = include_str!("../../templates/spark_master_service.yaml");
const WORKER_DEPLOYMENT: &str = include_str!("../../templates/spark_worker_deployment.yaml");

/// Built-in template text
pub fn builtin_template(template: TemplateId) -> &'static str {
    match template {
        TemplateId::MasterDeployment => MASTER_DEPLOYMENT,
        TemplateId::MasterService => MASTER_SERVICE,
        TemplateId::WorkerDeployment => WORKER_DEPLOYMENT,
    }
}

/// Substitute `${KEY}` placeholders in one pass. Unknown placeholders are left
/// as they are and substituted values are never expanded again.
pub fn render_template(template: &str, values: &BTreeMap<String, String>) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some((start, key, end)) = next_placeholder(rest) {
        let Some(value) = values.get(key) else {
            rendered.push_str(&rest[..end]);
            rest = &rest[end..];
            continue;
        };

        if rest[..start].ends_with('"') && rest[end..].starts_with('"') {
            rendered.push_str(&rest[..start - 1]);
            rendered.push_str(&quote(value));
            rest = &rest[end + 1..];
        } else {
            rendered.push_str(&rest[..start]);
            rendered.push_str(value);
            rest = &rest[end..];
        }
    }

    rendered.push_str(rest);
    rendered
}

/// Keys of every placeholder in a template
pub fn placeholders(template: &str) -> BTreeSet<&str> {
    let mut keys = BTreeSet::new();
    let mut rest = template;
    while let Some((_, key, end)) = next_placeholder(rest) {
        keys.insert(key);
        rest = &rest[end..];
    }
    keys
}

/// Start offset, key and end offset (past the `}`) of the first placeholder
fn next_placeholder(text: &str) -> Option<(usize, &str, usize)> {
    let start = text.find("${")?;
    let len = text[start + 2..].find('}')?;
    let end = start + 2 + len + 1;
    Some((start, &text[start + 2..end - 1], end))
}

/// Value as a YAML double-quoted scalar.
///
/// JSON strings are valid YAML; characters YAML treats as line breaks or
/// rejects as non-printable are escaped on top of that.
fn quote(value: &str) -> String {
    let json = serde_json::Value::from(value).to_string();
    let mut quoted = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '\u{7f}'..='\u{9f}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{feff}'
            | '\u{fffe}'
            | '\u{ffff}' => {
                quoted.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => quoted.push(c),
        }
    }
    quoted
}

/// Manifest builder over `${KEY}` YAML templates
#[derive(Debug, Clone, Default)]
pub struct TemplateManifestBuilder {
    /// Directory searched before the built-in templates
    template_dir: Option<PathBuf>,
}

impl TemplateManifestBuilder {
    /// Builder using only the built-in templates
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder preferring templates found in `dir`
    pub fn with_template_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: Some(dir.into()),
        }
    }

    /// Template source for an id
    fn load(&self, template: TemplateId) -> Result<String> {
        if let Some(dir) = &self.template_dir {
            let path = dir.join(template.file_name());
            if path.is_file() {
                debug!("Loading template {}", path.display());
                return read_template(&path);
            }
            debug!(
                "No {} in {}, using built-in template",
                template.file_name(),
                dir.display()
            );
        }
        Ok(builtin_template(template).to_string())
    }
}

fn read_template(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| Error::Template(format!("cannot read {}: {}", path.display(), e)))
}

impl ManifestBuilder for TemplateManifestBuilder {
    fn render(
        &self,
        template: TemplateId,
        values: &BTreeMap<String, String>,
    ) -> Result<serde_json::Value> {
        let source = self.load(template)?;
        for key in placeholders(&source) {
            if !values.contains_key(key) {
                warn!("Template {} has unresolved placeholder ${{{}}}", template, key);
            }
        }

        let rendered = render_template(&source, values);
        let document: serde_json::Value = serde_yaml::from_str(&rendered).map_err(|e| {
            Error::Template(format!("{} did not render to valid YAML: {}", template, e))
        })?;

        if !document.is_object() {
            return Err(Error::Template(format!(
                "{} did not render to a mapping",
                template
            )));
        }

        Ok(document)
    }
}
