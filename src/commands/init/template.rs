//! Project template catalogue
//!
//! Templates are registry packages. The catalogue comes from the template
//! service (`GET {base_url}/template`) when one is configured, otherwise
//! from the built-in list below.

use crate::config::TemplateConfig;
use crate::error::{ScaffoldError, ScaffoldResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// How a template is installed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// Copy `template/`, render placeholders, run the install command
    Normal,

    /// Hand over to the template package's own entry point
    Custom,
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

/// One entry of the template catalogue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateInfo {
    pub description: String,
    pub name: String,
    pub version: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_command: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore: Vec<String>,
}

impl TemplateInfo {
    /// Installation kind; an absent type means [`TemplateKind::Normal`]
    pub fn kind(&self) -> ScaffoldResult<TemplateKind> {
        match self.kind.as_deref() {
            None | Some("") | Some("normal") => Ok(TemplateKind::Normal),
            Some("custom") => Ok(TemplateKind::Custom),
            Some(other) => Err(ScaffoldError::TemplateType(other.to_string())),
        }
    }
}

/// Templates offered when no template service is configured
pub fn builtin_templates() -> Vec<TemplateInfo> {
    vec![
        TemplateInfo {
            description: "Base project template".to_string(),
            name: "scaffolder-template".to_string(),
            version: "1.0.0".to_string(),
            kind: Some("normal".to_string()),
            install_command: Some("npm install".to_string()),
            start_command: Some("npm run dev".to_string()),
            ignore: Vec::new(),
        },
        TemplateInfo {
            description: "Admin dashboard template".to_string(),
            name: "scaffolder-template-admin".to_string(),
            version: "1.0.0".to_string(),
            kind: Some("custom".to_string()),
            install_command: None,
            start_command: None,
            ignore: Vec::new(),
        },
    ]
}

/// Load the template catalogue
pub async fn fetch_templates(config: &TemplateConfig) -> ScaffoldResult<Vec<TemplateInfo>> {
    let Some(ref base_url) = config.base_url else {
        debug!("No template service configured, using built-in templates");
        return Ok(builtin_templates());
    };

    let url = format!("{}/template", base_url.trim_end_matches('/'));
    debug!("Fetching templates: {}", url);
    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
        .build()
        .into();

    let target = url.clone();
    let result = tokio::task::spawn_blocking(move || -> Result<Vec<TemplateInfo>, String> {
        let mut response = agent.get(&target).call().map_err(|e| e.to_string())?;
        response
            .body_mut()
            .read_json::<Vec<TemplateInfo>>()
            .map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| ScaffoldError::User(format!("Template request task failed: {}", e)))?;

    let templates = result
        .map_err(|reason| ScaffoldError::User(format!("Failed to fetch templates from {}: {}", url, reason)))?;
    debug!("Template service offers {} template(s)", templates.len());
    Ok(templates)
}
