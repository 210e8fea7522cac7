//! Generator configuration, read from the environment.

use crate::error::{JobError, Result};
use deckgen_core::{ListMarkerSyntax, RecordMode, RenderOptions};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_CONTENT_COLUMN: &str = "jeschro_content";
const DEFAULT_TEMPLATE: &str = "templates/template.pptx";
const DEFAULT_OUTPUT_DIR: &str = "./output";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// OAuth2 client credentials for the data service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    /// Base URL of the environment; the token scope is `{resource}/.default`.
    pub resource: String,
}

/// Where generated files are stored in the data service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    /// Entity set of file records.
    pub file_set: String,
    /// Column holding the file name.
    pub name_field: String,
    /// Navigation property linking a file record to its job.
    pub job_binding: String,
    /// Entity set of jobs.
    pub job_set: String,
    /// Primary key column of file records.
    pub id_field: String,
    /// File column receiving the document.
    pub file_column: String,
}

impl Default for UploadTarget {
    fn default() -> Self {
        Self {
            file_set: "jeschro_files".to_string(),
            name_field: "jeschro_name".to_string(),
            job_binding: "jeschro_Job".to_string(),
            job_set: "jeschro_jobs".to_string(),
            id_field: "jeschro_fileid".to_string(),
            file_column: "jeschro_file".to_string(),
        }
    }
}

/// Everything a generation job needs besides the job id.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Web API root, e.g. `https://org.api.crm.dynamics.com/api/data/v9.2/`.
    pub api_url: String,
    pub credentials: Credentials,
    /// Entity set the job records are read from.
    pub entity: String,
    pub columns: Vec<String>,
    /// Column compared against the job id.
    pub filter_column: String,
    /// Column holding each record's JSON content.
    pub content_column: String,
    pub template_path: PathBuf,
    pub output_dir: PathBuf,
    pub render: RenderOptions,
    /// Timeout of every HTTP request.
    pub timeout: Duration,
    pub upload: UploadTarget,
}

impl GeneratorConfig {
    /// Load from the process environment, after reading `.env` if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &str| {
            var(key).ok_or_else(|| {
                JobError::ConfigurationMissing(format!(
                    "Required environment variable '{}' is not set",
                    key
                ))
            })
        };

        let columns: Vec<String> = require("DATAVERSE_ENTITY_COLUMNS")?
            .split(',')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        let record_mode = match var("DECKGEN_RECORD_MODE") {
            Some(v) => v.parse::<RecordMode>().map_err(JobError::InvalidConfiguration)?,
            None => RecordMode::default(),
        };
        let marker_syntax = match var("DECKGEN_MARKER_SYNTAX") {
            Some(v) => v
                .parse::<ListMarkerSyntax>()
                .map_err(JobError::InvalidConfiguration)?,
            None => ListMarkerSyntax::default(),
        };
        let timeout = match var("DECKGEN_HTTP_TIMEOUT_SECS") {
            Some(v) => v.parse::<u64>().map_err(|e| {
                JobError::InvalidConfiguration(format!("DECKGEN_HTTP_TIMEOUT_SECS '{}': {}", v, e))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            api_url: require("DATAVERSE_API_URL")?,
            credentials: Credentials {
                tenant_id: require("DATAVERSE_TENANT_ID")?,
                client_id: require("DATAVERSE_CLIENT_ID")?,
                client_secret: require("DATAVERSE_CLIENT_SECRET")?,
                resource: require("DATAVERSE_URL")?,
            },
            entity: require("DATAVERSE_ENTITY")?,
            columns,
            filter_column: require("DATAVERSE_ENTITY_FILTER_COLUMN")?,
            content_column: var("DATAVERSE_CONTENT_COLUMN")
                .unwrap_or_else(|| DEFAULT_CONTENT_COLUMN.to_string()),
            template_path: PathBuf::from(
                var("PPTX_TEMPLATE").unwrap_or_else(|| DEFAULT_TEMPLATE.to_string()),
            ),
            output_dir: PathBuf::from(
                var("DECKGEN_OUTPUT_DIR").unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()),
            ),
            render: RenderOptions {
                record_mode,
                marker_syntax,
                ..RenderOptions::default()
            },
            timeout: Duration::from_secs(timeout),
            upload: UploadTarget::default(),
        })
    }
}
