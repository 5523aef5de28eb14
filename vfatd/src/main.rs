// SPDX-License-Identifier: MIT

mod config;
mod server;
mod summary;
mod utils;

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use log::{error, info};
use vfatfs::prelude::*;

use crate::config::{Overrides, ServerConfig};
use crate::server::Server;
use crate::summary::{VolumeSummary, WindowTable};
use crate::utils::LogLevel;

#[derive(Parser)]
#[command(name = "vfatd", version, about = "Virtual FAT32 block server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Only print warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// More output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Args)]
struct VolumeArgs {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory to present as a FAT32 volume
    #[arg(short, long)]
    source: Option<PathBuf>,

    /// Volume label
    #[arg(short, long)]
    label: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the volume and serve it over TCP
    Serve {
        #[command(flatten)]
        volume: VolumeArgs,

        /// Listen port
        #[arg(short, long)]
        port: Option<u16>,

        /// Listen address
        #[arg(short, long)]
        bind: Option<IpAddr>,
    },
    /// Build the volume and print its layout
    Inspect {
        #[command(flatten)]
        volume: VolumeArgs,

        /// Also list every file window
        #[arg(long)]
        files: bool,
    },
}

fn load_volume(config: &ServerConfig) -> anyhow::Result<Arc<Volume>> {
    let source = match config.validate() {
        Ok(source) => source,
        Err(e) => {
            error!("{e}");
            return Err(e.into());
        }
    };
    info!("Building volume from {}", source.display());
    let volume = Volume::build(source, &config.build_options())
        .with_context(|| format!("building volume from {}", source.display()))?;
    Ok(Arc::new(volume))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    utils::init(LogLevel::from_flags(cli.quiet, cli.verbose));

    match cli.command {
        Commands::Serve { volume, port, bind } => {
            let config = ServerConfig::load(
                volume.config.as_deref(),
                Overrides {
                    source: volume.source,
                    bind,
                    port,
                    volume_label: volume.label,
                },
            )?;
            let image = load_volume(&config)?;
            if !cli.quiet {
                println!("{}", VolumeSummary(&image));
            }

            let server = Server::bind(config.listen_addr(), image)
                .with_context(|| format!("binding {}", config.listen_addr()))?;
            server.run()?;
        }
        Commands::Inspect { volume, files } => {
            let config = ServerConfig::load(
                volume.config.as_deref(),
                Overrides {
                    source: volume.source,
                    volume_label: volume.label,
                    ..Default::default()
                },
            )?;
            let image = load_volume(&config)?;
            println!("{}", VolumeSummary(&image));
            if files {
                println!("{}", WindowTable(&image));
            }
        }
    }

    Ok(())
}
