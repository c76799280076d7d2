use crate::error::Result;
use crate::pipeline::CleanupReport;
use serde::Serialize;
use std::path::PathBuf;

/// JSON reporter for programmatic output
pub struct JsonReporter {
    output_path: Option<PathBuf>,
}

impl JsonReporter {
    pub fn new(output_path: Option<PathBuf>) -> Self {
        Self { output_path }
    }

    pub fn report(&self, report: &CleanupReport) -> Result<()> {
        let envelope = JsonEnvelope {
            version: "1.0",
            report,
        };
        let json = serde_json::to_string_pretty(&envelope)
            .map_err(|e| crate::error::CleanupError::Config(e.to_string()))?;

        if let Some(path) = &self.output_path {
            std::fs::write(path, &json)?;
            println!("Report written to: {}", path.display());
        } else {
            println!("{}", json);
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct JsonEnvelope<'a> {
    version: &'static str,
    #[serde(flatten)]
    report: &'a CleanupReport,
}
