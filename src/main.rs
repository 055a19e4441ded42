//! AlienFX lighting CLI
//!
//! Talks to Alienware lighting controllers over HID, across all the
//! protocol generations the core crate knows.

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use alienfx_core::{ActionKind, Color};
use alienfx_transport::HidDiscovery;

mod cli;
use cli::{Cli, Commands};

mod commands;
use commands::set::EffectTiming;

mod mappings;
use mappings::MappingsFile;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let filter = match cli.device.as_deref() {
        Some(arg) => Some(commands::parse_device_filter(arg)?),
        None => None,
    };
    let mappings_path = match cli.mappings.clone() {
        Some(path) => path,
        None => MappingsFile::default_path().context("cannot determine a mappings path ($HOME unset)")?,
    };
    let mut mappings = MappingsFile::load(&mappings_path)
        .with_context(|| format!("loading {}", mappings_path.display()))?;

    let mut discovery = HidDiscovery::new()?;
    let mut registry = commands::open_registry(&mut discovery)?;

    let timing = EffectTiming {
        tempo: cli.tempo,
        length: cli.length,
    };

    // --brightness applies before any lighting command
    if !matches!(cli.command, Some(Commands::Setdim { .. })) {
        commands::set::pre_brightness(&mut registry, filter, &mappings, cli.brightness)?;
    }

    match cli.command {
        None | Some(Commands::Status) => {
            commands::query::status(&mut registry)?;
        }

        Some(Commands::Setall { r, g, b }) => {
            commands::set::setall(&mut registry, filter, &mappings, Color::new(r, g, b))?;
        }
        Some(Commands::Setone { light, r, g, b }) => {
            commands::set::setone(&mut registry, filter, &mappings, &light, Color::new(r, g, b))?;
        }
        Some(Commands::Setzone { zone, r, g, b }) => {
            commands::set::setzone(&mut registry, filter, &mappings, &zone, Color::new(r, g, b))?;
        }
        Some(Commands::Setaction {
            action,
            light,
            r,
            g,
            b,
            r2,
            g2,
            b2,
        }) => {
            let action: ActionKind = action.parse()?;
            commands::set::setaction(
                &mut registry,
                filter,
                &mappings,
                action,
                &light,
                timing,
                Color::new(r, g, b),
                Color::new(r2, g2, b2),
            )?;
        }
        Some(Commands::Setzoneaction {
            action,
            zone,
            r,
            g,
            b,
            r2,
            g2,
            b2,
        }) => {
            let action: ActionKind = action.parse()?;
            commands::set::setzoneaction(
                &mut registry,
                filter,
                &mappings,
                action,
                &zone,
                timing,
                Color::new(r, g, b),
                Color::new(r2, g2, b2),
            )?;
        }
        Some(Commands::Setdim { level, power }) => {
            commands::set::setdim(&mut registry, filter, &mappings, level, power)?;
        }
        Some(Commands::Setglobal {
            effect,
            mode,
            r,
            g,
            b,
            r2,
            g2,
            b2,
            colors,
        }) => {
            commands::set::setglobal(
                &mut registry,
                filter,
                cli.tempo,
                effect,
                mode,
                Color::new(r, g, b),
                Color::new(r2, g2, b2),
                colors,
            )?;
        }
        Some(Commands::Probe { count }) => {
            commands::probe::probe(&mut registry, &mut mappings, &mappings_path, count)?;
        }
        Some(Commands::Createzone { name, lights }) => {
            commands::probe::createzone(&mut registry, &mut mappings, &mappings_path, &name, &lights)?;
        }
    }

    Ok(())
}
