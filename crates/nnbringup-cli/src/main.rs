//! Binary entrypoint for nnbringup.
use std::io::{self, Write};

use nnbringup_cli::{config::Settings, logging, run};

fn main() {
    // NNBRINGUP_LOG and NNBRINGUP_SEED tune logging and weight initialization
    let settings = Settings::from_env();
    if let Err(e) = logging::init(&settings.log_filter) {
        eprintln!("{:#}", e);
    }
    settings.log_warnings();

    let status = {
        let stdout = io::stdout();
        let stderr = io::stderr();
        let (mut out, mut err) = (stdout.lock(), stderr.lock());
        let status = run(std::env::args_os(), &settings, &mut out, &mut err);
        let _ = out.flush();
        status
    };

    std::process::exit(status.code());
}
