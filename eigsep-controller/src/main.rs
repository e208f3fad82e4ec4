//! EIGSEP mount controller binary

use clap::Parser;
use embassy_executor::Spawner;

use eigsep_controller::cli::Cli;
use eigsep_controller::{app, logging};

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let code = match app::main(cli).await {
        Ok(()) => 0,
        Err(err) => {
            log::error!("{}", err);
            1
        }
    };
    std::process::exit(code);
}
