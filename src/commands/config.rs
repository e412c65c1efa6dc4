use anyhow::Result;
use colored::Colorize;
use hwp_tagger::config::Config;
use tracing::info;

/// Execute the config show command
///
/// Displays the effective configuration (file, environment and defaults)
pub fn show(cfg: &Config) -> Result<()> {
    println!("{}", "Current Configuration:".green().bold());
    println!();

    // Serialize to TOML format
    let toml_string = toml::to_string_pretty(cfg)?;
    println!("{}", toml_string);

    info!("Configuration displayed successfully");
    Ok(())
}

/// Execute the config validate command
///
/// Loading already validated the configuration; print a summary
pub fn validate(cfg: &Config) {
    println!("{}", "✓ Configuration is valid".green());
    println!();
    println!("{}", "Summary:".bold());
    println!(
        "  {}: {}",
        "Device".cyan(),
        cfg.device.address.as_deref().unwrap_or("(not set)")
    );
    println!(
        "  {}: {} ({} days kept)",
        "Log Prefix".cyan(),
        cfg.output.log_prefix.display(),
        cfg.output.retention_days
    );
    println!("  {}: {} lines", "Buffer".cyan(), cfg.tagger.buffer_capacity);
    println!("  {}: {}", "Log Level".cyan(), cfg.logging.level);

    info!("Configuration validation successful");
}
