//! Remote job orchestration: fetch a job's records from Dataverse, render
//! the slide template and upload the generated presentation.

pub mod config;
pub mod credentials;
pub mod dataverse;
pub mod error;
pub mod job;

pub use config::{Credentials, GeneratorConfig, UploadTarget};
pub use credentials::{ClientCredentials, CredentialProvider};
pub use dataverse::{DataverseClient, RecordQuery, RecordSource, UploadSink};
pub use error::{JobError, Outcome, Result};
pub use job::{output_filename, JobRunner, Report, ReportGenerator};
