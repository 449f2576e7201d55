use super::commands::ConfigAction;
use anyhow::{bail, Result};
use shroud_crypto::generate_secret;
use shroud_daemon::ShroudConfig;
use std::path::Path;

pub fn handle_config(config_path: &Path, action: Option<&ConfigAction>) -> Result<()> {
    match action {
        Some(ConfigAction::Show) | None => {
            if !config_path.exists() {
                println!("No configuration file found at {:?}, showing defaults", config_path);
            }
            let config = ShroudConfig::load(config_path)?;
            print!("{}", config.redacted());
        }
        Some(ConfigAction::Validate) => match ShroudConfig::load(config_path) {
            Ok(config) => {
                println!("[+] Configuration is valid");
                for warning in config.check_security_warnings() {
                    println!("[!] {}", warning.message);
                }
            }
            Err(e) => bail!("Configuration error: {}", e),
        },
        Some(ConfigAction::Init { force }) => {
            if config_path.exists() && !*force {
                bail!("{:?} already exists (use --force to overwrite)", config_path);
            }
            ShroudConfig::default().save(config_path)?;
            println!("[+] Wrote default configuration to {:?}", config_path);
            println!();
            println!("The signing secret is never stored in the config file. Export one before `shroud run`:");
            println!("  export SHROUD_SIGNING_SECRET={}", generate_secret());
        }
    }
    Ok(())
}
