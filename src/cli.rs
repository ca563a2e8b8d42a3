use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Provision CMake, Ninja and a C/C++ compiler, then run the project's build script"
)]
pub struct Args {
    /// Path to configuration file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Never prompt; decline confirmations unless --yes is given
    #[arg(long, global = true)]
    pub no_interaction: bool,

    /// Sub‑commands (check, install, build, etc.)
    #[command(subcommand)]
    pub sub: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Check for the required tools (Exit 0 = all present, 1 = some missing)
    Check,
    /// Install missing tools (Exit 0 = all present afterwards)
    Install {
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Find the build script and print its path (Exit 0 = found)
    Locate {
        /// Directory to start searching from (default: current directory)
        dir: Option<PathBuf>,
    },
    /// Locate and run the build script (Exit 0 = build succeeded)
    Build {
        /// Directory to start searching from (default: current directory)
        dir: Option<PathBuf>,
    },
    /// Full flow: check, install, re-check, build (default if no sub‑command)
    Run {
        /// Directory to start searching from (default: current directory)
        dir: Option<PathBuf>,

        /// Answer yes to the install and build confirmations
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigCmd,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCmd {
    /// Write the built-in defaults to the config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
}
