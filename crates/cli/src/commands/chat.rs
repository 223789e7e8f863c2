//! Chat command handler.
//!
//! Reads questions from stdin, one per line. Each line is answered
//! independently; no history is carried between turns.

use super::output::render_answer;
use clap::Args;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use yatri_core::AppResult;
use yatri_knowledge::RagEngine;

const EXIT_WORDS: &[&str] = &["exit", "quit", ":q"];

/// Interactive session
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Print each answer result as a JSON line
    #[arg(long)]
    pub json: bool,
}

impl ChatCommand {
    pub async fn execute(&self, engine: &RagEngine) -> AppResult<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        if !self.json {
            eprintln!("Ask about travel in India. Type 'exit' to leave.");
        }

        loop {
            if !self.json {
                print!("you> ");
                std::io::stdout().flush()?;
            }

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let line = line.trim();

            if EXIT_WORDS.contains(&line) {
                break;
            }
            if line.is_empty() {
                continue;
            }

            let result = engine.answer(line).await;
            if self.json {
                println!("{}", serde_json::to_string(&result)?);
            } else {
                println!("\nyatri> {}\n", render_answer(&result));
            }
        }

        if !self.json {
            println!();
        }
        tracing::debug!("Chat session ended");
        Ok(())
    }
}
