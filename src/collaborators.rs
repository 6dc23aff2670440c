//! Interfaces for the surfaces this crate hands results to, but does
//! not implement: a persistent result store and a report renderer.
//! Both are out of scope here — upload/serving transport, storage
//! schema and document layout belong to the service that embeds this
//! crate, not to the detector itself.

use crate::AnalysisResult;

/// Persists or retrieves a completed analysis by id.
pub trait ResultStore {
    type Error;

    fn save(&self, result: &AnalysisResult) -> Result<(), Self::Error>;
    fn load(&self, analysis_id: &str) -> Result<Option<AnalysisResult>, Self::Error>;
}

/// Renders a completed analysis into an external report format.
pub trait ReportRenderer {
    type Error;

    fn render(&self, result: &AnalysisResult) -> Result<Vec<u8>, Self::Error>;
}
