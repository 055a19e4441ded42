// CLI definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "alienfx")]
#[command(author, version, about = "Alienware AlienFX lighting control for Linux")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Hardware brightness 0-100 applied before the command
    #[arg(short, long, global = true, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub brightness: Option<u8>,

    /// Effect tempo (higher is faster)
    #[arg(short, long, global = true, default_value = "8")]
    pub tempo: u8,

    /// Effect phase length
    #[arg(short, long, global = true, default_value = "8")]
    pub length: u8,

    /// Only touch the device with this id (vid:pid, hex)
    #[arg(long, global = true, value_name = "VID:PID")]
    pub device: Option<String>,

    /// Mappings file (default: $XDG_DATA_HOME/alienfx/mappings.json)
    #[arg(long, global = true, value_name = "FILE")]
    pub mappings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set every light on every device to one color
    #[command(visible_alias = "all")]
    Setall {
        /// Red (0-255)
        r: u8,
        /// Green (0-255)
        g: u8,
        /// Blue (0-255)
        b: u8,
    },

    /// Set one light to one color
    #[command(visible_alias = "one")]
    Setone {
        /// Light index or saved light name
        light: String,
        /// Red (0-255)
        r: u8,
        /// Green (0-255)
        g: u8,
        /// Blue (0-255)
        b: u8,
    },

    /// Set every light in a saved zone to one color
    #[command(visible_alias = "zone")]
    Setzone {
        /// Zone name (see createzone)
        zone: String,
        /// Red (0-255)
        r: u8,
        /// Green (0-255)
        g: u8,
        /// Blue (0-255)
        b: u8,
    },

    /// Run an effect on one light
    #[command(visible_alias = "action")]
    Setaction {
        /// Effect: color, pulse, morph, breathing, spectrum, rainbow
        action: String,
        /// Light index or saved light name
        light: String,
        /// Red (0-255)
        r: u8,
        /// Green (0-255)
        g: u8,
        /// Blue (0-255)
        b: u8,
        /// Second color red (morph target)
        #[arg(default_value = "0")]
        r2: u8,
        /// Second color green
        #[arg(default_value = "0")]
        g2: u8,
        /// Second color blue
        #[arg(default_value = "0")]
        b2: u8,
    },

    /// Run an effect on every light in a saved zone
    #[command(visible_alias = "zoneaction")]
    Setzoneaction {
        /// Effect: color, pulse, morph, breathing, spectrum, rainbow
        action: String,
        /// Zone name
        zone: String,
        /// Red (0-255)
        r: u8,
        /// Green (0-255)
        g: u8,
        /// Blue (0-255)
        b: u8,
        /// Second color red (morph target)
        #[arg(default_value = "0")]
        r2: u8,
        /// Second color green
        #[arg(default_value = "0")]
        g2: u8,
        /// Second color blue
        #[arg(default_value = "0")]
        b2: u8,
    },

    /// Set hardware brightness
    #[command(visible_alias = "dim")]
    Setdim {
        /// Brightness (0-100)
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        level: u8,
        /// Also dim power-button lights
        #[arg(long)]
        power: bool,
    },

    /// Set a firmware global effect (newer controllers only)
    #[command(visible_alias = "global")]
    Setglobal {
        /// Effect code (0 = off)
        effect: u8,
        /// Effect mode/flags byte
        #[arg(default_value = "0")]
        mode: u8,
        /// Red (0-255)
        #[arg(default_value = "0")]
        r: u8,
        /// Green (0-255)
        #[arg(default_value = "0")]
        g: u8,
        /// Blue (0-255)
        #[arg(default_value = "0")]
        b: u8,
        /// Second color red
        #[arg(default_value = "0")]
        r2: u8,
        /// Second color green
        #[arg(default_value = "0")]
        g2: u8,
        /// Second color blue
        #[arg(default_value = "0")]
        b2: u8,
        /// Color count override (1 or 2; default: 2 when a second
        /// color is given)
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=2))]
        colors: Option<u8>,
    },

    /// Show detected controllers and their state
    #[command(visible_alias = "st")]
    Status,

    /// Light up lights one at a time and record their names
    Probe {
        /// Lights to walk per device (default 24)
        #[arg(long, default_value = "24")]
        count: u8,
    },

    /// Interactively build a named zone from saved lights
    Createzone {
        /// Zone name to create or replace
        name: String,
        /// Lights as "light" or "vid:pid/light" (index or saved name)
        lights: Vec<String>,
    },
}
