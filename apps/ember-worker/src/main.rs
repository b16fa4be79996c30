use clap::Parser;

use ember_worker::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	ember_worker::run(Args::parse()).await
}
