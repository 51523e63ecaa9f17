use clap::Parser;

use archon::cli::{self, Cli};
use archon::telemetry;

fn main() {
    telemetry::init();
    let cli = Cli::parse();
    let code = cli::run(cli);
    std::process::exit(code);
}
