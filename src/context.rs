//! Request-scoped analysis context
//!
//! Each analysis run gets its own identifier and working directory. Nothing
//! here is global: the context is created by the caller, passed explicitly
//! through the analyzer, and removed by the caller when the run ends.

use crate::error::AnalysisResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Identity and scratch space of one analysis run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisContext {
    request_id: Uuid,
    work_dir: PathBuf,
    /// Where the analyzed media came from, echoed back in the report
    #[serde(skip_serializing_if = "Option::is_none")]
    source_url: Option<String>,
    created_at_utc: DateTime<Utc>,
}

impl AnalysisContext {
    /// New context with a random request id and a working directory of
    /// `<root>/<request_id>`
    pub fn new(root: &Path) -> Self {
        Self::with_request_id(root, Uuid::new_v4())
    }

    /// New context for a caller-assigned request id
    pub fn with_request_id(root: &Path, request_id: Uuid) -> Self {
        Self {
            request_id,
            work_dir: root.join(request_id.to_string()),
            source_url: None,
            created_at_utc: Utc::now(),
        }
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }

    pub fn created_at_utc(&self) -> DateTime<Utc> {
        self.created_at_utc
    }

    /// Create the working directory (and parents) if missing
    pub fn prepare(&self) -> AnalysisResult<()> {
        std::fs::create_dir_all(&self.work_dir)?;
        Ok(())
    }

    /// Remove the working directory and everything in it.
    ///
    /// A directory that was never created is not an error.
    pub fn cleanup(&self) -> AnalysisResult<()> {
        match std::fs::remove_dir_all(&self.work_dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
