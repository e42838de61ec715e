use clap::Parser;
use marketpanel::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
