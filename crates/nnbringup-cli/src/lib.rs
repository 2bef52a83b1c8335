//! nnbringup command line front end
//!
//! Parses arguments, builds the execution context and drives the bring-up
//! pipeline over the reference runtime.
pub mod cli;
pub mod config;
pub mod logging;

use clap::{error::ErrorKind, Parser};
use std::ffi::OsString;
use std::io::Write;

use nnbringup_core::{BringupPipeline, ExecutionContext, ExitStatus};
use nnbringup_runtime::NeuralNetRuntime;

use cli::Cli;
use config::Settings;

/// Run one bring-up from raw process arguments. `args` includes the program
/// name, which is echoed in the usage line.
pub fn run<I, T>(
    args: I,
    settings: &Settings,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> ExitStatus
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    let program = args
        .first()
        .map(|arg| arg.to_string_lossy().into_owned())
        .unwrap_or_else(|| "nnbringup".to_string());

    let cli = match Cli::try_parse_from(&args) {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = write!(out, "{}", e.render());
            return ExitStatus::Ok;
        }
        Err(e) => {
            tracing::debug!(kind = ?e.kind(), "argument parsing failed");
            return usage(&program, out);
        }
    };

    let Some(config_path) = cli.model_config else {
        return usage(&program, out);
    };
    if !cli.extra.is_empty() {
        tracing::warn!(ignored = ?cli.extra, "extra arguments ignored");
    }

    let ctx = ExecutionContext::new(&config_path, settings.seed);
    tracing::debug!(trace_id = %ctx.trace_id, seed = %ctx.seed, "starting bring-up");

    let mut pipeline = BringupPipeline::new(NeuralNetRuntime::new());
    pipeline.execute(&ctx, out, err)
}

fn usage(program: &str, out: &mut dyn Write) -> ExitStatus {
    let _ = writeln!(out, "Usage: {} <model_config>", program);
    let _ = out.flush();
    ExitStatus::Usage
}

#[cfg(test)]
mod tests {
    use super::*;
    use nnbringup_core::Seed;

    fn settings() -> Settings {
        Settings {
            log_filter: "off".to_string(),
            seed: Seed(1),
            warnings: Vec::new(),
        }
    }

    fn run_args(args: &[&str]) -> (ExitStatus, String, String) {
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let status = run(args.iter().copied(), &settings(), &mut out, &mut err);
        (
            status,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn test_usage_without_config() {
        let (status, out, err) = run_args(&["./nnbringup"]);
        assert_eq!(status, ExitStatus::Usage);
        assert_eq!(out, "Usage: ./nnbringup <model_config>\n");
        assert!(err.is_empty());
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.ini");
        let path = path.to_str().unwrap();

        let (status, out, err) = run_args(&["nnbringup", path]);
        assert_eq!(status, ExitStatus::Failure);
        assert!(out.is_empty());
        assert_eq!(err.lines().count(), 1);
        assert!(err.starts_with("Error while loading model! details: "));
    }

    #[test]
    fn test_version_goes_to_stdout() {
        let (status, out, _) = run_args(&["nnbringup", "--version"]);
        assert_eq!(status, ExitStatus::Ok);
        assert!(out.contains(nnbringup_core::NNBRINGUP_VERSION));
    }

    #[test]
    fn test_hyphen_leading_path_is_loaded() {
        let (status, out, err) = run_args(&["nnbringup", "-model.ini"]);
        assert_eq!(status, ExitStatus::Failure);
        assert!(out.is_empty());
        assert!(err.starts_with("Error while loading model! details: "), "got {:?}", err);
        assert!(err.contains("-model.ini"));

        let (status, _, err) = run_args(&["nnbringup", "-h"]);
        assert_eq!(status, ExitStatus::Failure);
        assert!(err.starts_with("Error while loading model!"));
    }

    #[test]
    #[cfg(unix)]
    fn test_unparsable_arguments_print_usage() {
        use std::os::unix::ffi::OsStringExt;

        let args = vec![
            OsString::from("nnbringup"),
            OsString::from("model.ini"),
            OsString::from_vec(vec![0xff, 0xfe]),
        ];
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let status = run(args, &settings(), &mut out, &mut err);

        assert_eq!(status, ExitStatus::Usage);
        assert_eq!(String::from_utf8(out).unwrap(), "Usage: nnbringup <model_config>\n");
        assert!(err.is_empty());
    }
}
