use clap::Parser;
use gateclone::cli::{self, args::Args};

fn main() -> gateclone::Result<()> {
    let args = Args::parse();
    cli::init_logging(&args.log_level);
    cli::run(args)
}
