//! The "generate presentation for job" operation.

use crate::config::GeneratorConfig;
use crate::credentials::ClientCredentials;
use crate::dataverse::{DataverseClient, RecordQuery, RecordSource, UploadSink};
use crate::error::{JobError, Result};
use deckgen_core::content;
use deckgen_core::{JobMetadata, RenderReport, Renderer};
use deckgen_pptx::PptxTemplate;
use reqwest::blocking::Client;
use serde::Serialize;
use std::sync::Arc;

/// What a successful job produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub filename: String,
    /// Id of the file record the document was uploaded to.
    pub record_id: String,
    /// Number of records rendered.
    pub records: usize,
    pub render: RenderReport,
}

/// Anything that can run a job by id.
pub trait ReportGenerator: Send + Sync {
    fn generate(&self, job_id: &str) -> Result<Report>;
}

/// Name of the document generated for a job.
pub fn output_filename(job_id: &str) -> String {
    format!("{}_report.pptx", job_id)
}

/// Fetches a job's records, renders the template and uploads the result.
pub struct JobRunner {
    config: GeneratorConfig,
    source: Arc<dyn RecordSource>,
    sink: Arc<dyn UploadSink>,
}

impl JobRunner {
    pub fn new(
        config: GeneratorConfig,
        source: Arc<dyn RecordSource>,
        sink: Arc<dyn UploadSink>,
    ) -> Self {
        Self {
            config,
            source,
            sink,
        }
    }

    /// A runner talking to the configured Dataverse environment.
    pub fn from_config(config: GeneratorConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| JobError::InvalidConfiguration(format!("HTTP client: {}", e)))?;
        let credentials = Arc::new(ClientCredentials::new(
            http.clone(),
            config.credentials.clone(),
        ));
        let client = Arc::new(DataverseClient::new(
            http,
            config.api_url.clone(),
            credentials,
            config.upload.clone(),
        ));
        Ok(Self::new(config, client.clone(), client))
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }
}

impl ReportGenerator for JobRunner {
    fn generate(&self, job_id: &str) -> Result<Report> {
        let job_id = job_id.trim();
        if job_id.is_empty() {
            return Err(JobError::ConfigurationMissing("jobid is required".to_string()));
        }
        if job_id.contains(['/', '\\']) || job_id.contains("..") {
            return Err(JobError::InvalidJobId(job_id.to_string()));
        }

        let query = RecordQuery::new(
            self.config.entity.as_str(),
            self.config.columns.clone(),
            self.config.filter_column.as_str(),
            job_id,
        );
        let records = self.source.fetch(&query)?;
        if records.is_empty() {
            log::info!("Job {}: no records", job_id);
            return Err(JobError::RecordNotFound);
        }
        log::info!("Job {}: fetched {} record(s)", job_id, records.len());

        let template = PptxTemplate::open(&self.config.template_path)?;
        let job = JobMetadata::now(job_id);
        let contents = content::resolve(&records, &self.config.content_column, &job);
        let (document, render) = Renderer::new(self.config.render).render(template.document(), &contents);

        std::fs::create_dir_all(&self.config.output_dir)?;
        let filename = output_filename(job_id);
        let path = self.config.output_dir.join(&filename);
        template.save(&document, &path)?;

        let record_id = self.sink.create_file_record(job_id, &filename)?;
        let bytes = std::fs::read(&path)?;
        self.sink.upload(&record_id, &filename, bytes)?;
        std::fs::remove_file(&path)?;

        log::info!("Job {}: uploaded {} to record {}", job_id, filename, record_id);
        Ok(Report {
            filename,
            record_id,
            records: records.len(),
            render,
        })
    }
}
