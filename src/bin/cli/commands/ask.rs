use anyhow::{Context, Result};

use syllabus_lib::rag::source_tag;

use crate::app::App;
use crate::render::terminal::{paint, Color};
use crate::OutputFormat;

pub async fn run(
    app: &App,
    question: &str,
    top_k: Option<usize>,
    show_sources: bool,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let assistant = app.assistant()?;
    let answer = assistant
        .answer(question, &[], top_k)
        .await
        .context("Failed to generate an answer")?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&answer)?);
        }
        OutputFormat::Plain => {
            println!("{}", answer.text.trim());
            if show_sources && !answer.sources.is_empty() {
                println!("\n{}", paint("Sources:", Color::BOLD, use_color));
                for (i, source) in answer.sources.iter().enumerate() {
                    println!(
                        "  [{}] {} {}",
                        i + 1,
                        source_tag(&source.metadata),
                        paint(&format!("({:.3})", source.score), Color::DIM, use_color)
                    );
                }
            }
        }
    }

    Ok(())
}
