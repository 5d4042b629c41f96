use clap::Parser;
use tuneforge_tuner::{run_cli, Cli, TuneError};

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run_cli(cli) {
        eprintln!("error: {:#}", e);
        let code = e.downcast_ref::<TuneError>().map(TuneError::exit_code).unwrap_or(1);
        std::process::exit(code);
    }
}
