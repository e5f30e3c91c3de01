use std::path::PathBuf;

use anyhow::{bail, Result};

use syllabus_lib::{ingest, DocumentLoader, IngestOptions};

use crate::app::App;
use crate::render::terminal::{paint, Color};
use crate::OutputFormat;

pub async fn run(
    app: &App,
    data_dir: Option<PathBuf>,
    clear: bool,
    fail_fast: bool,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let data_dir = data_dir.unwrap_or_else(|| app.config.data_dir.clone());
    let loader = DocumentLoader::new(data_dir);
    let options = IngestOptions {
        clear_first: clear,
        fail_fast,
    };

    let report = ingest(&loader, &app.index, app.config.chunking, options).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Plain => {
            for failure in &report.failures {
                println!(
                    "{} {} ({:?}): {}",
                    paint("failed", Color::RED, use_color),
                    failure.path.display(),
                    failure.stage,
                    failure.message
                );
            }
            let summary = format!(
                "{}/{} files loaded, {} chunks indexed into '{}'",
                report.files_loaded,
                report.files_seen,
                report.chunks_indexed,
                app.index.collection_name()
            );
            let color = if report.is_clean() { Color::GREEN } else { Color::YELLOW };
            println!("{}", paint(&summary, color, use_color));
        }
    }

    if report.aborted {
        bail!("Ingestion stopped at the first failure (--fail-fast)");
    }
    Ok(())
}
