use std::io::Read;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use kitchen_production_lib::{init_tracing, Production, ProductionConfig, SqliteStore};

const USAGE: &str = "usage: kitchen-production <sweep | import | day YYYY-MM-DD>";

fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ProductionConfig::from_env();
    let store = SqliteStore::open(&config.database_path)
        .with_context(|| format!("opening {}", config.database_path.display()))?;
    let mut production = Production::open(store, config)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("sweep") => {
            let report = production.sweep()?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Some("import") => {
            let mut body = String::new();
            std::io::stdin()
                .read_to_string(&mut body)
                .context("reading commissary order from stdin")?;
            let (order, tasks) = production.import_commissary_json(&body)?;
            let output = serde_json::json!({ "order": order, "tasks": tasks });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Some("day") => {
            let raw = args.get(1).context(USAGE)?;
            let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .with_context(|| format!("invalid date {raw}"))?;
            println!("{}", serde_json::to_string_pretty(&production.day_schedule(date))?);
        }
        _ => bail!(USAGE),
    }

    Ok(())
}
