// src/main.rs — flagprobe entry point

use clap::Parser;

use flagprobe::cli::{run::run, Cli};
use flagprobe::infra::logger;

fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over --debug when set
    logger::init_logging(logger::level_for(cli.debug));

    if let Err(e) = run(&cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
