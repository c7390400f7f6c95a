use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = sb_api::Args::parse();

	sb_api::run(args).await
}
