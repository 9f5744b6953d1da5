use clap::Parser;
use log::info;

mod args;
mod count;

fn main() {
    let args = args::Args::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if args.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();
    info!("args: {:?}", args);

    if count::run_election_cli(&args).is_err() {
        std::process::exit(1);
    }
}
