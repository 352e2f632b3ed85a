//! Parsing Options.
//! `wfnet <NET> [-c config.toml] [-o report.txt] [--dot DIR] [--json]`

use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;
use thiserror::Error;

use crate::config::DEFAULT_CONFIG_FILE;

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("mismatched quotes in flags")]
    Quotes(#[from] shellwords::MismatchedQuotes),
    #[error(transparent)]
    Clap(#[from] clap::Error),
}

fn make_options_parser() -> clap::Command {
    Command::new("wfnet")
        .no_binary_name(true)
        .version("v0.1.0")
        .about("Workflow-net soundness analyzer")
        .arg(
            Arg::new("net")
                .value_name("NET")
                .help("Net description, JSON or RON (.ron)")
                .required(true),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Search limits and server settings")
                .default_value(DEFAULT_CONFIG_FILE),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Path to file where the report will be stored"),
        )
        .arg(
            Arg::new("dot")
                .long("dot")
                .value_name("DIR")
                .help("Write the net, reachability graph and witness steps as DOT files"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Print the report as JSON"),
        )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub net_file: PathBuf,
    pub config: PathBuf,
    pub output: Option<String>,
    pub dot_dir: Option<PathBuf>,
    pub json: bool,
}

impl Options {
    pub fn parse_from_str(s: &str) -> Result<Self, OptionsError> {
        let flags = shellwords::split(s)?;
        Self::parse_from_args(&flags)
    }

    pub fn parse_from_args(flags: &[String]) -> Result<Self, OptionsError> {
        let app = make_options_parser();
        let matches = app.try_get_matches_from(flags.iter())?;

        let net_file = matches
            .get_one::<String>("net")
            .map(PathBuf::from)
            .unwrap_or_default();
        let config = matches
            .get_one::<String>("config")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        let output = matches.get_one::<String>("output").cloned();
        let dot_dir = matches.get_one::<String>("dot").map(PathBuf::from);
        let json = matches.get_flag("json");

        Ok(Options {
            net_file,
            config,
            output,
            dot_dir,
            json,
        })
    }
}
