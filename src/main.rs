// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{error::Error, path::PathBuf};

use clap::{crate_version, Parser, Subcommand};
use padbridge::{config, device::SupportedModel, host, logging, Bridge};
use tracing::info;

const SYSTEMD_SERVICE: &str = r#"
[Unit]
Description=controller to sequencer bridge
After=jack.service

[Service]
Type=simple
Restart=on-failure
EnvironmentFile=-/etc/default/padbridge
ExecStart=/usr/local/bin/padbridge start --config "$PADBRIDGE_CONFIG"

[Install]
WantedBy=multi-user.target
Alias=padbridge.service
"#;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "Bridges grid MIDI controllers to an OSC sequencer host."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start will run the bridge until interrupted.
    Start {
        /// The path to the bridge config.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Turns on debug logging.
        #[arg(short, long)]
        debug: bool,
    },
    /// Lists the supported controller models.
    Models {},
    /// Lists the JACK MIDI ports and the model each one matches.
    Ports {},
    /// Prints a systemd service definition to stdout.
    Systemd {},
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    logging::init(false);

    let cli = Cli::parse();

    match cli.command {
        Commands::Start { config, debug } => {
            let config = match config {
                Some(path) => config::Bridge::deserialize(&path)?,
                None => config::Bridge::default(),
            }
            .with_debug(debug);
            logging::set_debug(config.debug());

            let bridge = Bridge::initialize(&config)?;
            info!("Bridge started, waiting for a controller.");
            tokio::signal::ctrl_c().await?;
            bridge.shutdown().await;
        }
        Commands::Models {} => {
            println!("Models:");
            for model in SupportedModel::ALL {
                println!("- {} ({})", model, model.alias());
            }
        }
        Commands::Ports {} => {
            let ports = host::list_ports()?;

            if ports.is_empty() {
                println!("No MIDI ports found.");
                return Ok(());
            }

            println!("Ports:");
            for (name, aliases) in ports {
                match SupportedModel::detect(aliases.as_slice()) {
                    Some(model) => println!("- {} [{}]", name, model),
                    None => println!("- {}", name),
                }
                for alias in aliases {
                    println!("    {}", alias);
                }
            }
        }
        Commands::Systemd {} => {
            println!("{}", SYSTEMD_SERVICE);
        }
    }

    Ok(())
}
