//! Rendering of engine results for the terminal.

use yatri_core::AppResult;
use yatri_knowledge::{AnswerResult, AnswerStatus};

/// Print a result as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Human-readable answer: text, then sources or a status note.
pub fn render_answer(result: &AnswerResult) -> String {
    let mut out = result.answer.clone();

    match result.status {
        AnswerStatus::Ok if !result.sources.is_empty() => {
            out.push_str("\n\nSources:");
            for (i, source) in result.sources.iter().enumerate() {
                out.push_str(&format!(
                    "\n  [{}] {} - budget: {} (score {:.3})",
                    i + 1,
                    source.label,
                    source.budget,
                    source.score
                ));
            }
        }
        AnswerStatus::NoContext => {
            out.push_str(
                "\n\n(No matching travel information was found; this is general guidance.)",
            );
        }
        _ => {}
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use yatri_knowledge::rag::{AnswerDiagnostics, RetrievalDiagnostics, StageTimings};
    use yatri_knowledge::CitedSource;

    fn result(status: AnswerStatus, sources: Vec<CitedSource>) -> AnswerResult {
        AnswerResult {
            status,
            answer: "Visit Solang Valley.".to_string(),
            sources,
            diagnostics: AnswerDiagnostics {
                retrieval: RetrievalDiagnostics::default(),
                failure: None,
                timings: StageTimings::default(),
                model: "qwen2.5:1.5b".to_string(),
                timestamp: Utc::now(),
            },
        }
    }

    #[test]
    fn test_render_ok_lists_sources() {
        let source = CitedSource {
            chunk_id: "manali_001".to_string(),
            label: "Manali, Himachal Pradesh (Adventure)".to_string(),
            location: "Manali, Himachal Pradesh".to_string(),
            category: "Adventure".to_string(),
            budget: "medium".to_string(),
            score: 0.81,
        };

        let text = render_answer(&result(AnswerStatus::Ok, vec![source]));
        assert!(text.starts_with("Visit Solang Valley."));
        assert!(text.contains("[1] Manali, Himachal Pradesh (Adventure) - budget: medium (score 0.810)"));
    }

    #[test]
    fn test_render_no_context_adds_note() {
        let text = render_answer(&result(AnswerStatus::NoContext, Vec::new()));
        assert!(text.contains("general guidance"));
        assert!(!text.contains("Sources:"));
    }
}
