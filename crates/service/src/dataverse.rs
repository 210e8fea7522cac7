//! Record source and upload sink backed by the Dataverse Web API.

use crate::config::UploadTarget;
use crate::credentials::CredentialProvider;
use crate::error::{JobError, Result};
use deckgen_core::Record;
use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// A query for the records of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordQuery {
    /// Entity set name.
    pub entity: String,
    pub columns: Vec<String>,
    /// Column compared with `value`.
    pub filter_column: String,
    pub value: String,
}

impl RecordQuery {
    pub fn new(
        entity: impl Into<String>,
        columns: Vec<String>,
        filter_column: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            entity: entity.into(),
            columns,
            filter_column: filter_column.into(),
            value: value.into(),
        }
    }

    /// `$select` value, if any columns are named.
    pub fn select(&self) -> Option<String> {
        if self.columns.is_empty() {
            None
        } else {
            Some(self.columns.join(","))
        }
    }

    /// `$filter` value: one equality with an OData string literal.
    pub fn filter(&self) -> String {
        format!(
            "{} eq '{}'",
            self.filter_column,
            self.value.replace('\'', "''")
        )
    }
}

/// Where job records come from.
pub trait RecordSource: Send + Sync {
    /// Records matching the query, in service order.
    fn fetch(&self, query: &RecordQuery) -> Result<Vec<Record>>;
}

/// Where generated files go.
pub trait UploadSink: Send + Sync {
    /// Create a file record linked to the job; returns its id.
    fn create_file_record(&self, job_id: &str, filename: &str) -> Result<String>;

    /// Attach the file content to a file record.
    fn upload(&self, record_id: &str, filename: &str, bytes: Vec<u8>) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct Collection {
    #[serde(default)]
    value: Vec<Record>,
}

/// Blocking Dataverse Web API client. Requests are made once, without
/// retries, each with a fresh token.
pub struct DataverseClient {
    http: Client,
    api_url: String,
    credentials: Arc<dyn CredentialProvider>,
    upload: UploadTarget,
}

impl DataverseClient {
    pub fn new(
        http: Client,
        api_url: impl Into<String>,
        credentials: Arc<dyn CredentialProvider>,
        upload: UploadTarget,
    ) -> Self {
        Self {
            http,
            api_url: api_url.into(),
            credentials,
            upload,
        }
    }

    /// URL of an entity set or a path below the API root.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_url.trim_end_matches('/'), path)
    }

    /// Body of the file record creation request.
    pub fn file_record_body(&self, job_id: &str, filename: &str) -> Value {
        let mut body = Map::new();
        body.insert(self.upload.name_field.clone(), Value::from(filename));
        body.insert(
            format!("{}@odata.bind", self.upload.job_binding),
            Value::from(format!("/{}({})", self.upload.job_set, job_id)),
        );
        Value::Object(body)
    }
}

/// Turn a non-success response into an error carrying status and body.
fn check(response: Response, operation: &'static str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(JobError::remote(
        operation,
        format!("HTTP {}: {}", status, body.trim()),
    ))
}

impl RecordSource for DataverseClient {
    fn fetch(&self, query: &RecordQuery) -> Result<Vec<Record>> {
        const OPERATION: &str = "Fetch records";

        let token = self.credentials.access_token()?;
        let mut params = Vec::new();
        if let Some(select) = query.select() {
            params.push(("$select", select));
        }
        params.push(("$filter", query.filter()));

        log::debug!("GET {} {:?}", query.entity, params);
        let response = self
            .http
            .get(self.url(&query.entity))
            .bearer_auth(token)
            .header(ACCEPT, "application/json")
            .query(&params)
            .send()
            .map_err(|e| JobError::remote(OPERATION, e.to_string()))?;

        let collection: Collection = check(response, OPERATION)?
            .json()
            .map_err(|e| JobError::remote(OPERATION, e.to_string()))?;
        Ok(collection.value)
    }
}

impl UploadSink for DataverseClient {
    fn create_file_record(&self, job_id: &str, filename: &str) -> Result<String> {
        const OPERATION: &str = "Create file record";

        let token = self.credentials.access_token()?;
        let response = self
            .http
            .post(self.url(&self.upload.file_set))
            .bearer_auth(token)
            .header("Prefer", "return=representation")
            .json(&self.file_record_body(job_id, filename))
            .send()
            .map_err(|e| JobError::remote(OPERATION, e.to_string()))?;

        let created: Value = check(response, OPERATION)?
            .json()
            .map_err(|e| JobError::remote(OPERATION, e.to_string()))?;

        match created.get(&self.upload.id_field) {
            Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
            _ => Err(JobError::remote(
                OPERATION,
                format!("response has no '{}'", self.upload.id_field),
            )),
        }
    }

    fn upload(&self, record_id: &str, filename: &str, bytes: Vec<u8>) -> Result<()> {
        const OPERATION: &str = "Upload file";

        let token = self.credentials.access_token()?;
        let url = self.url(&format!(
            "{}({})/{}",
            self.upload.file_set, record_id, self.upload.file_column
        ));
        log::info!("Uploading {} ({} bytes) to {}", filename, bytes.len(), url);

        let response = self
            .http
            .patch(url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header("x-ms-file-name", filename)
            .body(bytes)
            .send()
            .map_err(|e| JobError::remote(OPERATION, e.to_string()))?;
        check(response, OPERATION)?;
        Ok(())
    }
}
