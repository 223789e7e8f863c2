//! Ask command handler.

use super::output::{print_json, render_answer};
use clap::Args;
use std::path::PathBuf;
use yatri_core::{AppError, AppResult};
use yatri_knowledge::RagEngine;

/// Ask a single travel question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: Option<String>,

    /// Read the question from a file
    #[arg(short, long, conflicts_with = "question")]
    pub file: Option<PathBuf>,

    /// Output the full answer result as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, engine: &RagEngine) -> AppResult<()> {
        let question = self.question()?;
        let result = engine.answer(&question).await;

        if self.json {
            print_json(&result)?;
        } else {
            println!("{}", render_answer(&result));
        }

        Ok(())
    }

    fn question(&self) -> AppResult<String> {
        match (&self.question, &self.file) {
            (Some(q), _) => Ok(q.clone()),
            (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
                AppError::Config(format!("Failed to read question file {:?}: {}", path, e))
            }),
            (None, None) => Err(AppError::Validation(
                "No question provided. Usage: yatri ask \"<question>\"".to_string(),
            )),
        }
    }
}
