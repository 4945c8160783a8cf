use crate::cli::ConfigCommands;
use crate::commands::collect::resolve_config_path;
use crate::output::{output_data, print_success};
use nutanix_collector::config::CollectorConfig;
use nutanix_collector::resources::account_id;

pub fn handle_config_command(cmd: &ConfigCommands) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        ConfigCommands::Example { format } => {
            output_data(&CollectorConfig::example(), format)?;
        }
        ConfigCommands::Validate { config } => {
            let path = resolve_config_path(config.as_deref())?;
            let config = CollectorConfig::load(&path)?;
            for creds in &config.credentials {
                println!(
                    "  {} -> {}:{}{}",
                    account_id(&creds.name),
                    creds.endpoint,
                    creds.port,
                    if creds.insecure { " (insecure)" } else { "" }
                );
            }
            print_success(&format!(
                "{} is valid ({} account(s), collectors: {})",
                path.display(),
                config.credentials.len(),
                config.collectors.join(", ")
            ));
        }
    }
    Ok(())
}
