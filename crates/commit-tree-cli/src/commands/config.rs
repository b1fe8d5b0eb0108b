//! Config command implementation.
//!
//! Manages CLI configuration.

use anyhow::Result;

use crate::config::Config;

/// Show current configuration.
pub fn show(config: &Config) -> Result<()> {
    println!("Commit Tree CLI Configuration");
    println!("{:-<40}", "");

    println!("Trees:               {}", config.value("trees")?);
    println!("Refresh Interval:    {} ms", config.refresh_interval_ms);
    println!("Conflict Poll:       {} ms", config.conflict_poll_ms);
    println!("Commit Limit:        {}", config.value("commit-limit")?);

    if let Some(config_path) = Config::config_file_path() {
        println!("\nConfig file: {}", config_path.display());
    }

    Ok(())
}

/// Set a configuration value.
pub fn set(config: &mut Config, key: &str, value: &str) -> Result<()> {
    config.set_value(key, value)?;
    println!("Set {} to: {}", key, config.value(key)?);
    config.save()?;
    Ok(())
}

/// Get a configuration value.
pub fn get(config: &Config, key: &str) -> Result<()> {
    println!("{}", config.value(key)?);
    Ok(())
}

/// Reset configuration to defaults.
pub fn reset() -> Result<()> {
    let config = Config::default();
    config.save()?;
    println!("Configuration reset to defaults");
    Ok(())
}
