//! Quiz Cart CLI

use std::process::ExitCode;

use clap::Parser;
use quiz_cart::observability::init_subscriber;

mod cli;

#[tokio::main]
async fn main() -> ExitCode {
    _ = dotenvy::dotenv();

    let cli = cli::Cli::parse();

    if let Err(error) = init_subscriber(cli.logging()) {
        #[expect(
            clippy::print_stderr,
            reason = "logging failed to initialise, stderr is all that is left"
        )]
        {
            eprintln!("{error}");
        }

        return ExitCode::FAILURE;
    }

    match cli.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            #[expect(clippy::print_stderr, reason = "command errors are reported to the user")]
            {
                eprintln!("{error}");
            }

            ExitCode::FAILURE
        }
    }
}
