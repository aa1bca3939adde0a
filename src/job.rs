//! Layout Jobs - Versioned Requests
//!
//! A job file describes paper, settings and requested photos. Resolving one
//! is the only path from user input to a packed session, and resolution
//! ALWAYS validates first. No bypass.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{PhotoSizeSpec, SizeCatalog};
use crate::layout::{LayoutConfig, Rotation};
use crate::session::LayoutSession;
use crate::validate::{LayoutCheck, LayoutSetup, Validator};
use crate::{ENGINE_VERSION, MIN_JOB_VERSION};

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Unknown paper size: {0}")]
    UnknownPaper(String),

    #[error("Unknown photo size: {0}")]
    UnknownPhotoSize(String),

    #[error("Job requires engine >= {0}, current is {1}")]
    EngineVersionMismatch(String, String),

    #[error("Job format {0} is older than the oldest supported {1}")]
    FormatTooOld(String, String),

    #[error("Invalid version string: {0}")]
    InvalidVersion(String),

    #[error("Job rejected: {0}")]
    Rejected(String),

    #[error("Invalid job payload: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Cannot read job file: {0}")]
    Io(#[from] std::io::Error),
}

/// One batch of identical instances.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPhoto {
    pub source: String,
    pub size: String,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default)]
    pub rotation: Rotation,
}

fn default_count() -> u32 {
    1
}

/// Fill the sheet with one image at the given formats instead of (or after)
/// explicit counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobAutoFill {
    pub source: String,
    pub sizes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutJob {
    #[serde(default = "default_version")]
    pub format_version: String,
    #[serde(default = "default_version")]
    pub engine_min_version: String,
    #[serde(default = "default_paper")]
    pub paper: String,
    #[serde(default)]
    pub config: LayoutConfig,
    #[serde(default)]
    pub photos: Vec<JobPhoto>,
    #[serde(default)]
    pub auto_fill: Option<JobAutoFill>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_paper() -> String {
    "10x15".to_string()
}

impl LayoutJob {
    pub fn from_json(payload: &str) -> Result<Self, JobError> {
        Ok(serde_json::from_str(payload)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, JobError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

/// Resolves jobs against the catalog, validates them and builds sessions.
pub struct JobRunner {
    catalog: SizeCatalog,
    validator: Validator,
}

impl JobRunner {
    pub fn new(catalog: SizeCatalog) -> Self {
        Self {
            catalog,
            validator: Validator::new(),
        }
    }

    pub fn catalog(&self) -> &SizeCatalog {
        &self.catalog
    }

    /// Check a job without packing it. This is the ONLY validation entry
    /// point.
    pub fn validate(&self, job: &LayoutJob) -> Result<LayoutCheck, JobError> {
        check_versions(job)?;

        let paper = self
            .catalog
            .paper(&job.paper)
            .ok_or_else(|| JobError::UnknownPaper(job.paper.clone()))?;
        let sizes = self.resolve_sizes(job)?;

        Ok(self.validator.check(&LayoutSetup {
            paper,
            config: &job.config,
            photo_sizes: &sizes,
        }))
    }

    /// Build the packed session. ALWAYS validates first; error-severity
    /// violations reject the job.
    pub fn run(&self, job: &LayoutJob) -> Result<LayoutSession, JobError> {
        let check = self.validate(job)?;
        if !check.valid {
            let messages: Vec<_> = check
                .violations
                .iter()
                .map(|v| format!("{}: {}", v.rule, v.message))
                .collect();
            return Err(JobError::Rejected(messages.join("; ")));
        }

        let paper = self
            .catalog
            .paper(&job.paper)
            .ok_or_else(|| JobError::UnknownPaper(job.paper.clone()))?
            .clone();

        let mut session = LayoutSession::new(paper, job.config.clone());

        for photo in &job.photos {
            let size = self
                .catalog
                .photo_size(&photo.size)
                .ok_or_else(|| JobError::UnknownPhotoSize(photo.size.clone()))?
                .clone();
            for _ in 0..photo.count {
                session = session.add_rotated(&photo.source, &size, photo.rotation);
            }
        }

        if let Some(fill) = &job.auto_fill {
            let sizes: Vec<PhotoSizeSpec> = fill
                .sizes
                .iter()
                .map(|key| {
                    self.catalog
                        .photo_size(key)
                        .cloned()
                        .ok_or_else(|| JobError::UnknownPhotoSize(key.clone()))
                })
                .collect::<Result<_, _>>()?;
            session = session.auto_fill(&fill.source, &sizes);
        }

        Ok(session)
    }

    /// Every photo size a job mentions, each key resolved once.
    fn resolve_sizes(&self, job: &LayoutJob) -> Result<Vec<PhotoSizeSpec>, JobError> {
        let mut keys: Vec<&str> = job.photos.iter().map(|p| p.size.as_str()).collect();
        if let Some(fill) = &job.auto_fill {
            keys.extend(fill.sizes.iter().map(String::as_str));
        }
        keys.sort_unstable();
        keys.dedup();

        keys.into_iter()
            .map(|key| {
                self.catalog
                    .photo_size(key)
                    .cloned()
                    .ok_or_else(|| JobError::UnknownPhotoSize(key.to_string()))
            })
            .collect()
    }
}

fn check_versions(job: &LayoutJob) -> Result<(), JobError> {
    let engine = semver::Version::parse(ENGINE_VERSION)
        .map_err(|_| JobError::InvalidVersion(ENGINE_VERSION.to_string()))?;
    let required = semver::Version::parse(&job.engine_min_version)
        .map_err(|_| JobError::InvalidVersion(job.engine_min_version.clone()))?;
    if engine < required {
        return Err(JobError::EngineVersionMismatch(
            job.engine_min_version.clone(),
            ENGINE_VERSION.to_string(),
        ));
    }

    let format = semver::Version::parse(&job.format_version)
        .map_err(|_| JobError::InvalidVersion(job.format_version.clone()))?;
    let oldest = semver::Version::parse(MIN_JOB_VERSION)
        .map_err(|_| JobError::InvalidVersion(MIN_JOB_VERSION.to_string()))?;
    if format < oldest {
        return Err(JobError::FormatTooOld(
            job.format_version.clone(),
            MIN_JOB_VERSION.to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_job_gets_defaults() {
        let job = LayoutJob::from_json("{}").unwrap();
        assert_eq!(job.format_version, "1.0.0");
        assert_eq!(job.paper, "10x15");
        assert_eq!(job.config.spacing_mm, 0.5);
        assert_eq!(job.config.margins.left, 5.0);
        assert!(job.photos.is_empty());
        assert!(job.auto_fill.is_none());
    }

    #[test]
    fn photo_count_defaults_to_one() {
        let job = LayoutJob::from_json(
            r#"{"paper": "a4", "photos": [{"source": "p.png", "size": "3x4"}]}"#,
        )
        .unwrap();
        assert_eq!(job.photos[0].count, 1);
        assert_eq!(job.photos[0].rotation, Rotation::R0);
    }

    #[test]
    fn future_engine_requirement_is_refused() {
        let runner = JobRunner::new(SizeCatalog::builtin());
        let job = LayoutJob::from_json(r#"{"paper": "a4", "engineMinVersion": "99.0.0"}"#).unwrap();
        let err = runner.validate(&job).unwrap_err();
        assert!(matches!(err, JobError::EngineVersionMismatch(..)));
    }

    #[test]
    fn unknown_keys_are_reported() {
        let runner = JobRunner::new(SizeCatalog::builtin());

        let job = LayoutJob::from_json(r#"{"paper": "letter"}"#).unwrap();
        assert!(matches!(
            runner.validate(&job).unwrap_err(),
            JobError::UnknownPaper(_)
        ));

        let job = LayoutJob::from_json(
            r#"{"paper": "a4", "photos": [{"source": "p.png", "size": "9x13"}]}"#,
        )
        .unwrap();
        assert!(matches!(
            runner.validate(&job).unwrap_err(),
            JobError::UnknownPhotoSize(_)
        ));
    }
}
