use clap::{CommandFactory, Parser};
use dnuds::cmd::{self, Cli};

fn main() {
    // Bare invocation prints usage instead of a missing-subcommand error.
    if std::env::args().len() == 1 {
        let _ = Cli::command().print_help();
        return;
    }

    let cli = Cli::parse();

    if let Err(e) = cmd::run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
