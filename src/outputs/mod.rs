//! Output generation: per-company reports and the cumulative master table.
//!
//! # Submodules
//!
//! - [`markdown`]: renders the human-readable company report
//! - [`json`]: renders the machine-readable company record
//! - [`table`]: renders the aggregate master CSV
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── markdown/{Company_Name}.md
//! ├── json/{Company_Name}.json
//! └── csv/master_research_results_{run-stamp}.csv
//! ```
//!
//! The master CSV is the run's checkpoint file: it is rewritten after every
//! batch via a temp-file-plus-rename so an interrupt can never leave a torn
//! table on disk. The run stamp is fixed when the sink is built, so all
//! checkpoints of one run land in one file.

use chrono::Local;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::fs;
use tracing::{info, instrument};

use crate::models::CompanyResult;
use crate::utils::ensure_writable_dir;

pub mod json;
pub mod markdown;
pub mod table;

/// Writes all pipeline outputs under one directory.
pub struct OutputSink {
    output_dir: PathBuf,
    master_csv: PathBuf,
    checkpoints: AtomicUsize,
}

impl OutputSink {
    pub fn new(output_dir: &str) -> Self {
        let output_dir = PathBuf::from(output_dir);
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let master_csv = output_dir
            .join("csv")
            .join(format!("master_research_results_{}.csv", stamp));
        OutputSink {
            output_dir,
            master_csv,
            checkpoints: AtomicUsize::new(0),
        }
    }

    /// Create the output subdirectories and verify they are writable.
    pub async fn prepare(&self) -> Result<(), Box<dyn Error>> {
        for subdir in ["markdown", "json", "csv"] {
            ensure_writable_dir(&self.output_dir.join(subdir).to_string_lossy()).await?;
        }
        Ok(())
    }

    /// Write the Markdown report and JSON record for one company.
    #[instrument(level = "info", skip_all, fields(company = %result.company.company_name))]
    pub async fn write_company(&self, result: &CompanyResult) -> Result<(), Box<dyn Error>> {
        let basename = result.company.basename();

        let report = markdown::company_report(result);
        let md_path = self.output_dir.join("markdown").join(format!("{}.md", basename));
        fs::write(&md_path, report).await?;

        let record = serde_json::to_string_pretty(&json::company_record(result))?;
        let json_path = self.output_dir.join("json").join(format!("{}.json", basename));
        fs::write(&json_path, record).await?;

        info!(md = %md_path.display(), json = %json_path.display(), "Saved company outputs");
        Ok(())
    }

    /// Rewrite the cumulative master CSV. This is the batch checkpoint:
    /// the write goes to a temp file first and is renamed into place.
    #[instrument(level = "info", skip_all, fields(companies = results.len()))]
    pub async fn checkpoint_master_table(
        &self,
        results: &[CompanyResult],
    ) -> Result<(), Box<dyn Error>> {
        let bytes = table::master_table_csv(results)?;
        let tmp_path = self.master_csv.with_extension("csv.tmp");
        fs::write(&tmp_path, bytes).await?;
        fs::rename(&tmp_path, &self.master_csv).await?;
        self.checkpoints.fetch_add(1, Ordering::SeqCst);
        info!(path = %self.master_csv.display(), "Checkpointed master CSV");
        Ok(())
    }

    pub fn checkpoints_written(&self) -> usize {
        self.checkpoints.load(Ordering::SeqCst)
    }

    pub fn master_csv_path(&self) -> &Path {
        &self.master_csv
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BackendKind, CompanyRecord, FetchResult, PagePayload, TargetOutcome};

    fn sample_result() -> CompanyResult {
        let company = CompanyRecord {
            company_name: "Acme Corp".to_string(),
            website: "https://acme.example".to_string(),
            industry: "Construction".to_string(),
            ..CompanyRecord::default()
        };
        let payload = PagePayload {
            markdown: "# Acme".to_string(),
            extracted: Some(serde_json::json!({"technology_stack": "Procore"})),
            links: vec![],
        };
        CompanyResult::new(
            company,
            vec![(
                "main_site".to_string(),
                TargetOutcome::Fetched(FetchResult::ok(BackendKind::Browser, 0.002, payload, None)),
            )],
        )
    }

    #[tokio::test]
    async fn test_write_company_creates_both_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let sink = OutputSink::new(&dir.path().to_string_lossy());
        sink.prepare().await.unwrap();
        sink.write_company(&sample_result()).await.unwrap();

        assert!(dir.path().join("markdown/Acme_Corp.md").is_file());
        assert!(dir.path().join("json/Acme_Corp.json").is_file());
    }

    #[tokio::test]
    async fn test_checkpoint_rewrites_one_file_and_counts() {
        let dir = tempfile::tempdir().unwrap();
        let sink = OutputSink::new(&dir.path().to_string_lossy());
        sink.prepare().await.unwrap();

        let results = vec![sample_result()];
        sink.checkpoint_master_table(&results).await.unwrap();
        sink.checkpoint_master_table(&results).await.unwrap();

        assert_eq!(sink.checkpoints_written(), 2);
        assert!(sink.master_csv_path().is_file());
        // Temp file must not linger after the rename.
        assert!(!sink.master_csv_path().with_extension("csv.tmp").exists());
        let csv_files: Vec<_> = std::fs::read_dir(dir.path().join("csv"))
            .unwrap()
            .collect();
        assert_eq!(csv_files.len(), 1);
    }
}
