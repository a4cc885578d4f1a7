//! Resume PDF upload: validation, S3 storage and text extraction.

use std::sync::OnceLock;

use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::errors::AppError;

pub const MAX_RESUME_BYTES: usize = 5 * 1024 * 1024;
const RESUME_PREFIX: &str = "resumes";
const PDF_MAGIC: &[u8] = b"%PDF";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No file uploaded")]
    Missing,

    #[error("Only PDF files are allowed")]
    NotPdf,

    #[error("File size must be less than 5MB")]
    TooLarge,

    #[error("Invalid resume filename")]
    BadFilename,

    #[error("Resume {0} not found")]
    NotFound(String),

    #[error("S3 error: {0}")]
    Storage(String),

    #[error("Could not read text from the PDF: {0}")]
    Extraction(String),
}

impl From<UploadError> for AppError {
    fn from(e: UploadError) -> Self {
        match e {
            UploadError::Missing
            | UploadError::NotPdf
            | UploadError::TooLarge
            | UploadError::BadFilename
            | UploadError::Extraction(_) => AppError::Validation(e.to_string()),
            UploadError::NotFound(_) => AppError::NotFound(e.to_string()),
            UploadError::Storage(msg) => AppError::Storage(msg),
        }
    }
}

/// Metadata returned to the uploader.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeUpload {
    pub id: String,
    pub filename: String,
    pub original_name: String,
    pub size: usize,
    pub uploaded_at: DateTime<Utc>,
    pub view_url: String,
    pub download_url: String,
}

/// Accepts a declared `application/pdf` or a body that starts with `%PDF`.
pub fn validate_pdf(content_type: Option<&str>, bytes: &[u8]) -> Result<(), UploadError> {
    if bytes.is_empty() {
        return Err(UploadError::Missing);
    }
    if bytes.len() > MAX_RESUME_BYTES {
        return Err(UploadError::TooLarge);
    }
    let declared_pdf = content_type
        .map(|ct| ct.trim().eq_ignore_ascii_case("application/pdf"))
        .unwrap_or(false);
    if !declared_pdf && !bytes.starts_with(PDF_MAGIC) {
        return Err(UploadError::NotPdf);
    }
    Ok(())
}

fn filename_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^resume_\d+_[a-z0-9]+\.pdf$").ok())
        .as_ref()
}

/// Only names this service generated may be read back.
pub fn is_resume_filename(name: &str) -> bool {
    filename_pattern().is_some_and(|re| re.is_match(name))
}

fn upload_id(now: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(11)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{}_{suffix}", now.timestamp_millis())
}

fn object_key(filename: &str) -> String {
    format!("{RESUME_PREFIX}/{filename}")
}

pub async fn store_resume(
    s3: &aws_sdk_s3::Client,
    bucket: &str,
    original_name: &str,
    bytes: Bytes,
) -> Result<ResumeUpload, UploadError> {
    let now = Utc::now();
    let id = upload_id(now);
    let filename = format!("resume_{id}.pdf");
    let size = bytes.len();
    let key = object_key(&filename);

    s3.put_object()
        .bucket(bucket)
        .key(&key)
        .body(ByteStream::from(bytes))
        .content_type("application/pdf")
        .send()
        .await
        .map_err(|e| UploadError::Storage(format!("upload failed: {e}")))?;

    info!("Uploaded resume to s3://{bucket}/{key} ({size} bytes)");
    Ok(ResumeUpload {
        id,
        view_url: format!("/api/v1/resume-match/resumes/{filename}"),
        download_url: format!("/api/v1/resume-match/resumes/{filename}?download=true"),
        filename,
        original_name: original_name.to_string(),
        size,
        uploaded_at: now,
    })
}

pub async fn fetch_resume(
    s3: &aws_sdk_s3::Client,
    bucket: &str,
    filename: &str,
) -> Result<Bytes, UploadError> {
    if !is_resume_filename(filename) {
        return Err(UploadError::BadFilename);
    }
    let object = s3
        .get_object()
        .bucket(bucket)
        .key(object_key(filename))
        .send()
        .await
        .map_err(|e| {
            let not_found = e
                .as_service_error()
                .is_some_and(|se| se.is_no_such_key());
            if not_found {
                UploadError::NotFound(filename.to_string())
            } else {
                UploadError::Storage(format!("download failed: {e}"))
            }
        })?;

    let data = object
        .body
        .collect()
        .await
        .map_err(|e| UploadError::Storage(format!("reading object body failed: {e}")))?;
    Ok(data.into_bytes())
}

/// Extracts plain text. PDF parsing is CPU-bound, so it runs off the runtime.
pub async fn extract_text(bytes: Bytes) -> Result<String, UploadError> {
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| UploadError::Extraction(e.to_string()))?
        .map_err(|e| UploadError::Extraction(e.to_string()))?;
    Ok(text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_pdf() {
        assert!(validate_pdf(Some("application/pdf"), b"anything").is_ok());
        assert!(validate_pdf(None, b"%PDF-1.7 ...").is_ok());
        assert!(matches!(
            validate_pdf(Some("image/png"), b"\x89PNG"),
            Err(UploadError::NotPdf)
        ));
        assert!(matches!(validate_pdf(Some("application/pdf"), b""), Err(UploadError::Missing)));
    }

    #[test]
    fn test_size_limit() {
        let at_limit = vec![b'%'; MAX_RESUME_BYTES];
        assert!(validate_pdf(Some("application/pdf"), &at_limit).is_ok());
        let over = vec![b'%'; MAX_RESUME_BYTES + 1];
        assert!(matches!(
            validate_pdf(Some("application/pdf"), &over),
            Err(UploadError::TooLarge)
        ));
    }

    #[test]
    fn test_generated_names_are_readable() {
        let id = upload_id(Utc::now());
        assert!(is_resume_filename(&format!("resume_{id}.pdf")));
        assert!(!is_resume_filename("../secrets.pdf"));
        assert!(!is_resume_filename("resume_1_abc.pdf.exe"));
    }
}
