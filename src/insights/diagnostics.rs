use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Kind of advanced diagnostic attached to a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    ThermalImage,
    AcousticRecording,
}

/// Turns an uploaded thermal image or acoustic recording into a description
///
/// There is no analysis algorithm behind this boundary yet; implementations
/// plug an external service in.
#[async_trait]
pub trait DiagnosticAnalyzer: Send + Sync {
    async fn describe(&self, kind: DiagnosticKind, file_name: &str, content: &[u8]) -> Result<String>;
}

/// Default analyzer used when no external service is configured
pub struct UnconfiguredDiagnostics;

#[async_trait]
impl DiagnosticAnalyzer for UnconfiguredDiagnostics {
    async fn describe(&self, kind: DiagnosticKind, file_name: &str, content: &[u8]) -> Result<String> {
        let what = match kind {
            DiagnosticKind::ThermalImage => "thermal image",
            DiagnosticKind::AcousticRecording => "acoustic recording",
        };
        Ok(format!(
            "No automated {} analysis is configured. Received '{}' ({} bytes); please describe the findings manually.",
            what,
            file_name,
            content.len()
        ))
    }
}
