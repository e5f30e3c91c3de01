use anyhow::{bail, Context, Result};

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &App, yes: bool, format: &OutputFormat) -> Result<()> {
    let name = app.index.collection_name();
    if !yes {
        bail!("Refusing to clear collection '{}' without --yes", name);
    }

    let removed = app.index.count().context("Failed to count records")?;
    app.index.clear().context("Failed to clear collection")?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({ "collection": name, "removed": removed });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Cleared {} records from '{}'", removed, name);
        }
    }

    Ok(())
}
