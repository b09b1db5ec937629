use anyhow::{Context, Result};
use std::path::Path;
use zencraft_core::config::ZencraftConfig;
use zencraft_core::seed::{insert_all_default_items, read_default_items, SeedStatus};
use zencraft_core::storage::open_database;

pub async fn run(config: &ZencraftConfig, file: &Path) -> Result<()> {
    let defaults = read_default_items(file)
        .await
        .with_context(|| format!("Failed to read default items from {}", file.display()))?;
    let db = open_database(config).await?;

    let progress = insert_all_default_items(db.as_ref(), &defaults, |p| {
        if p.status == SeedStatus::Processing {
            log::info!("Seeding {}", p.item_type);
        }
    })
    .await;

    let mut failed = 0;
    for p in &progress {
        match p.status {
            SeedStatus::Errored => {
                failed += 1;
                eprintln!("{:<16} errored: {}", p.item_type, p.error.as_deref().unwrap_or("unknown error"));
            }
            _ => println!(
                "{:<16} {} inserted, {} skipped",
                p.item_type,
                p.report.inserted.len(),
                p.report.failed.len()
            ),
        }
    }

    if failed > 0 {
        anyhow::bail!("{} item type(s) failed to seed", failed);
    }
    Ok(())
}
