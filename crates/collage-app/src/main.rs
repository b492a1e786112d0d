//! Main application entry point.

use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();
    log::info!("Starting Collage");

    let args = collage_app::Args::parse();
    let print_status = args.status;
    let result = args.into_job().and_then(|job| collage_app::run(&job));

    match result {
        Ok(outcome) => {
            if let Some(notice) = &outcome.notice {
                eprintln!("{notice}");
            }
            if print_status {
                println!("{}", outcome.status);
            }
            if let Some(preview) = &outcome.preview {
                println!("{}", preview.display());
            }
            match outcome.path {
                Some(path) => println!("{}", path.display()),
                None => eprintln!("Nothing to export"),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            eprintln!("collage: {e}");
            ExitCode::FAILURE
        }
    }
}
