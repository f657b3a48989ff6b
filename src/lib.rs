//! Form field inference and AcroForm widget overlay using lopdf
//!
//! This crate provides:
//! - Inference of fillable regions (underscore blanks, checkboxes, radio
//!   buttons) from extracted text fragments
//! - Semantic classification and naming of each field
//! - Materialization of the regions as interactive widgets in the PDF

pub mod classifier;
pub mod elements;
pub mod engine;
pub mod extractor;
pub mod fragment;
pub mod indicators;
pub mod materializer;
pub mod naming;
pub mod positioner;
pub mod regions;
pub mod source;

pub use classifier::{FieldContext, FieldType};
pub use elements::{load_elements, parse_elements};
pub use engine::{detect_fields, detect_fields_batch, FieldDetection, InferenceConfig};
pub use extractor::{extract_fragments, extract_fragments_mem};
pub use fragment::{Bounds, TextFragment};
pub use materializer::{materialize, MaterializeOptions, MaterializeReport, RegionError};
pub use regions::{FieldRegion, FieldStats};
pub use source::{DocumentSource, FileSource, MemorySource};

/// Options for a full fill request
#[derive(Debug, Clone, Default)]
pub struct FillOptions {
    pub inference: InferenceConfig,
    pub materialize: MaterializeOptions,
}

/// High-level form fill result
#[derive(Debug)]
pub struct FormFillResult {
    /// Inferred regions and per-type counts
    pub detection: FieldDetection,
    /// Widget placement outcome; `None` when no fields were found
    pub report: Option<MaterializeReport>,
    /// Summary suitable for showing to a user
    pub message: String,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

impl FormFillResult {
    /// The document with widgets, if one was produced
    pub fn pdf(&self) -> Option<&[u8]> {
        self.report.as_ref().map(|r| r.pdf.as_slice())
    }
}

/// Infer form fields and overlay widgets on the document from `source`
///
/// This function will:
/// 1. Run field inference over the fragments
/// 2. Return early, without fetching the document, if nothing was found
/// 3. Fetch the document and add one widget per region
pub fn fill_form(
    source: &dyn DocumentSource,
    fragments: &[TextFragment],
    options: &FillOptions,
) -> Result<FormFillResult, FormFillError> {
    let start = std::time::Instant::now();

    let detection = detect_fields(fragments, &options.inference);

    if detection.is_empty() {
        return Ok(FormFillResult {
            detection,
            report: None,
            message: "No fillable fields detected; document left unchanged".to_string(),
            processing_time_ms: start.elapsed().as_millis() as u64,
        });
    }

    log::debug!("fetching {}", source.describe());
    let pdf = source.fetch()?;
    let report = materializer::materialize(&pdf, &detection.regions, &options.materialize)?;

    let message = if report.error_count == 0 {
        format!("Added {} form fields", report.success_count)
    } else {
        format!(
            "Added {} form fields, {} could not be placed",
            report.success_count, report.error_count
        )
    };

    Ok(FormFillResult {
        detection,
        report: Some(report),
        message,
        processing_time_ms: start.elapsed().as_millis() as u64,
    })
}

/// Fill a document held in memory
pub fn fill_form_mem(
    buffer: &[u8],
    fragments: &[TextFragment],
    options: &FillOptions,
) -> Result<FormFillResult, FormFillError> {
    fill_form(&MemorySource::new(buffer.to_vec()), fragments, options)
}

#[derive(Debug, thiserror::Error)]
pub enum FormFillError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("PDF is encrypted")]
    Encrypted,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Failed to retrieve document: {0}")]
    Retrieval(String),
}

impl FormFillError {
    /// Whether the caller is at fault (bad request) rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(self, FormFillError::InvalidInput(_))
    }
}

impl From<lopdf::Error> for FormFillError {
    fn from(e: lopdf::Error) -> Self {
        FormFillError::Parse(e.to_string())
    }
}
