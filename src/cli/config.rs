//! Configuration management commands

use super::ConfigArgs;
use crate::config::Config;
use anyhow::Result;

pub async fn execute(args: ConfigArgs) -> Result<()> {
    if args.show {
        let mut config = Config::load().await?;
        for provider in config.providers.values_mut() {
            if provider.api_key.is_some() {
                provider.api_key = Some("<redacted>".to_string());
            }
        }
        println!("{}", toml::to_string_pretty(&config)?);
        println!("# data directory: {}", config.resolved_data_dir().display());
        return Ok(());
    }

    if args.init {
        Config::init_default().await?;
        println!("Configuration initialized");
        return Ok(());
    }

    if let Some(kv) = args.set {
        let Some((key, value)) = kv.split_once('=') else {
            anyhow::bail!("Invalid format. Use: --set key=value");
        };
        let (key, value) = (key.trim(), value.trim());
        Config::set(key, value).await?;
        if key.ends_with("api_key") {
            println!("Set {key}");
        } else {
            println!("Set {key} = {value}");
        }
        return Ok(());
    }

    println!("Use --show, --init, or --set key=value");
    Ok(())
}
