use anyhow::{Context, Result};

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &App, format: &OutputFormat) -> Result<()> {
    let count = app.index.count().context("Failed to count records")?;
    let name = app.index.collection_name();
    let path = app.index.db_path();

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "collection": name,
                "path": path,
                "count": count,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Collection: {}", name);
            println!("Database:   {}", path.display());
            println!("Records:    {}", count);
        }
    }

    Ok(())
}
