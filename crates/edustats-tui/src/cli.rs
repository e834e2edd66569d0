//! Command line flags.

use clap::Parser;
use edustats_core::Role;

#[derive(Parser, Debug)]
#[command(name = "edustats")]
#[command(about = "Terminal dashboard for education platform statistics")]
#[command(version)]
#[command(after_help = "Environment: EDUSTATS_API_URL, EDUSTATS_ROLE, EDUSTATS_TOKEN, RUST_LOG")]
pub struct Args {
    /// Fetch statistics once and print them as JSON (admin, teacher or student)
    #[arg(long, value_name = "ROLE", num_args = 0..=1)]
    print: Option<Option<Role>>,

    /// Keep cached statistics in memory only
    #[arg(long)]
    pub no_cache: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Dashboard,
    Print(Option<Role>),
}

impl Args {
    pub fn mode(&self) -> Mode {
        match self.print {
            Some(role) => Mode::Print(role),
            None => Mode::Dashboard,
        }
    }
}
