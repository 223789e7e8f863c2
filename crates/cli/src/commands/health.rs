//! Health command handler.

use super::output::print_json;
use clap::Args;
use yatri_core::AppResult;
use yatri_knowledge::{HealthReport, RagEngine};

/// Check the embedding model, vector index and generation backend
#[derive(Args, Debug)]
pub struct HealthCommand {
    /// Output the health report as JSON
    #[arg(long)]
    pub json: bool,
}

impl HealthCommand {
    pub async fn execute(&self, engine: &RagEngine) -> AppResult<()> {
        let report = engine.health().await;

        if self.json {
            print_json(&report)?;
        } else {
            println!("{}", render_health(&report));
        }

        Ok(())
    }
}

fn render_health(report: &HealthReport) -> String {
    let mark = |ok: bool| if ok { "ok" } else { "unavailable" };
    format!(
        "Embedding model ({}): {}\nVector index: {} ({} chunks)\nGeneration backend ({}): {}\nOverall: {}",
        report.embedding_model,
        mark(report.embedding_ok),
        mark(report.index_ok),
        report.document_count,
        report.generation_model,
        mark(report.backend_ok),
        if report.is_healthy() { "healthy" } else { "degraded" }
    )
}
