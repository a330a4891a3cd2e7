// SPDX-FileCopyrightText: 2026 Parkwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parkwatch - companion client for an ESP32 smart-parking controller.
//!
//! This is the binary entry point for the Parkwatch client.

use clap::{Parser, Subcommand};

mod flows;
mod serve;
mod shims;

/// Parkwatch - companion client for an ESP32 smart-parking controller.
#[derive(Parser, Debug)]
#[command(name = "parkwatch", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect to the broker and monitor the parking controller.
    Serve,
    /// Pair a new iButton with the controller.
    Pair,
    /// Put the controller into iButton-delete mode.
    Delete,
    /// Print the effective configuration.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match parkwatch_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            parkwatch_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Pair) => flows::run_pair(config).await,
        Some(Commands::Delete) => flows::run_delete(config).await,
        Some(Commands::Config) => {
            match toml::to_string_pretty(&config) {
                Ok(rendered) => {
                    print!("{rendered}");
                    Ok(())
                }
                Err(e) => Err(parkwatch_core::ParkwatchError::Internal(format!(
                    "could not render config: {e}"
                ))),
            }
        }
        None => {
            println!("parkwatch: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
