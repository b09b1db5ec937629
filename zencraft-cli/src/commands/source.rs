use anyhow::Result;
use zencraft_core::config::ZencraftConfig;
use zencraft_core::storage::data_source::{check_data_source, set_data_source};
use zencraft_core::storage::{AppDataSource, LocalDbInterface};

/// Print the persisted data source, or persist a new one
pub async fn run(config: &ZencraftConfig, source: Option<&str>) -> Result<()> {
    let local = LocalDbInterface::open_dir(&config.storage.db_name, &config.storage.data_dir)?;
    let backend = local.backend();

    match source {
        Some(raw) => {
            let source: AppDataSource = raw.parse()?;
            set_data_source(backend.as_ref(), source).await?;
            println!("Data source set to {}", source);
        }
        None => {
            let source = check_data_source(backend.as_ref()).await?;
            println!("{}", source);
            if let Some(forced) = config.storage.data_source {
                if forced != source {
                    println!("(overridden by configuration: {})", forced);
                }
            }
        }
    }
    Ok(())
}
