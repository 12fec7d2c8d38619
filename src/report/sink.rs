//! Report output.
//!
//! # Responsibilities
//! - Serialize the finalized report as CSV, one file per run
//! - Optionally push the file to a web host and build its public link
//!
//! # Design Decisions
//! - The file is named after the local start minute, `YYYYMMDD-HHMM.csv`
//! - An upload failure keeps the local file and reports its path

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Local};
use thiserror::Error;

use crate::config::schema::ReportConfig;
use crate::report::upload::{self, UploadError};
use crate::report::Report;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to encode report: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to write report {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The report was written locally but could not be uploaded.
    #[error("report written to {path} but upload failed: {source}")]
    Upload {
        path: PathBuf,
        #[source]
        source: UploadError,
    },
}

/// Where a written report can be found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLocation {
    pub path: PathBuf,
    /// Public URL, when the report was uploaded and a base URL is configured.
    pub link: Option<String>,
}

impl ReportLocation {
    /// The link if there is one, otherwise the local path.
    pub fn display_target(&self) -> String {
        self.link
            .clone()
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Destination of the finalized report.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn write(&self, report: &Report) -> Result<ReportLocation, SinkError>;
}

/// Encode `report` as CSV: header row, then one row per host in report order.
pub fn to_csv(report: &Report) -> Result<Vec<u8>, SinkError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(report.layout().header())?;
    for row in report.rows() {
        writer.write_record(row.cells())?;
    }
    writer
        .into_inner()
        .map_err(|e| SinkError::Csv(csv::Error::from(e.into_error())))
}

pub fn file_name(at: DateTime<Local>) -> String {
    format!("{}.csv", at.format("%Y%m%d-%H%M"))
}

#[derive(Debug, Clone)]
pub struct CsvReportSink {
    config: ReportConfig,
}

impl CsvReportSink {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    /// Write to an explicit file name inside the configured directory.
    pub async fn write_as(
        &self,
        report: &Report,
        name: &str,
    ) -> Result<ReportLocation, SinkError> {
        let bytes = to_csv(report)?;
        let path = self.config.directory.join(name);

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| SinkError::Write {
                path: path.clone(),
                source,
            })?;
        tracing::info!(path = %path.display(), rows = report.len(), "Report written");

        let Some(target) = self.config.upload_target.as_deref() else {
            return Ok(ReportLocation { path, link: None });
        };

        if let Err(source) = upload::upload(&self.config.scp_program, &path, target).await {
            return Err(SinkError::Upload { path, source });
        }

        let link = self.public_link(&path);
        Ok(ReportLocation { path, link })
    }

    fn public_link(&self, path: &Path) -> Option<String> {
        let base = self.config.public_url.as_deref()?;
        let name = path.file_name()?.to_string_lossy();
        Some(format!("{}/{}", base.trim_end_matches('/'), name))
    }
}

#[async_trait]
impl ReportSink for CsvReportSink {
    async fn write(&self, report: &Report) -> Result<ReportLocation, SinkError> {
        self.write_as(report, &file_name(Local::now())).await
    }
}
