use anyhow::{Context, Result};

use syllabus_lib::rag::source_tag;

use crate::app::App;
use crate::render::terminal::{paint, snippet, Color};
use crate::OutputFormat;

pub async fn run(
    app: &App,
    query: &str,
    top_k: Option<usize>,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let retriever = app.retriever();
    let top_k = top_k.unwrap_or_else(|| retriever.default_top_k());
    let results = retriever
        .search(query, top_k)
        .await
        .context("Search failed")?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        OutputFormat::Plain => {
            if results.is_empty() {
                println!("No results found for '{}'.", query);
                return Ok(());
            }

            for (i, r) in results.iter().enumerate() {
                println!(
                    "{:>2}. {} {}",
                    i + 1,
                    paint(&format!("{:.3}", r.score), Color::CYAN, use_color),
                    paint(&source_tag(&r.metadata), Color::BOLD, use_color)
                );
                println!("    {}", paint(&snippet(&r.content, 100), Color::DIM, use_color));
            }

            println!("\n{} results", results.len());
        }
    }

    Ok(())
}
