//! Command line arguments
use clap::{ArgAction, Parser};
use nnbringup_core::NNBRINGUP_VERSION;
use std::path::PathBuf;

/// Bring up a neural network from an INI description and print its shapes
/// and summaries.
///
/// Only `--help` and `--version` are flags. Anything else in first position,
/// including a value starting with `-`, is the model path.
#[derive(Debug, Parser)]
#[command(
    name = "nnbringup",
    version = NNBRINGUP_VERSION,
    about,
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct Cli {
    /// INI model description
    #[arg(value_name = "MODEL_CONFIG", allow_hyphen_values = true)]
    pub model_config: Option<PathBuf>,

    /// Accepted for compatibility and ignored
    #[arg(hide = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub extra: Vec<String>,

    /// Print help
    #[arg(long = "help", action = ArgAction::Help)]
    _help: Option<bool>,

    /// Print version
    #[arg(long = "version", action = ArgAction::Version)]
    _version: Option<bool>,
}
