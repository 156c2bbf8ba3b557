use clap::Parser;
use volshield::cli::{Cli, run};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
