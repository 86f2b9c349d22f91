use clap::{Args, Subcommand};
use std::fmt::Display;

use super::OutputFormat;
use giftswap::{Config, ConfigValue};

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                let mut config = config.clone();
                if config.api_key.value.is_some() {
                    config.api_key.value = Some("********".to_string());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        print_optional("store_url", &config.store_url);
                        print_optional("api_key", &config.api_key);
                        print_optional("auth_header", &config.auth_header);
                        print_value("data_dir", &config.data_dir.value.display(), &config.data_dir);
                        print_value(
                            "request_timeout_secs",
                            &config.request_timeout_secs.value,
                            &config.request_timeout_secs,
                        );

                        let m = &config.metadata;
                        print_value("metadata.proxy_url", &m.proxy_url.value, &m.proxy_url);
                        print_value(
                            "metadata.fallback_proxy_url",
                            &m.fallback_proxy_url.value,
                            &m.fallback_proxy_url,
                        );
                        print_value("metadata.timeout_secs", &m.timeout_secs.value, &m.timeout_secs);
                        print_value(
                            "metadata.cache_ttl_secs",
                            &m.cache_ttl_secs.value,
                            &m.cache_ttl_secs,
                        );
                        print_value(
                            "metadata.cache_max_entries",
                            &m.cache_max_entries.value,
                            &m.cache_max_entries,
                        );
                    }
                }
                Ok(())
            }
        }
    }
}

fn print_value<T>(key: &str, shown: &dyn Display, value: &ConfigValue<T>) {
    println!("{}: {}", key, shown);
    println!("  source: {}", value.source);
    println!();
}

fn print_optional(key: &str, value: &ConfigValue<Option<String>>) {
    let shown = value.value.as_deref().unwrap_or("(not set)");
    print_value(key, &shown, value);
}
