//! fob-play - run browser unit tests in headless Chrome.

use clap::Parser;
use fob_play::{cli, commands, error, logger, ui};
use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init_colors(args.no_color);

    commands::execute(args).await.map_err(error::into_report)
}
