use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = savor_api::Args::parse();

	savor_api::run(args).await
}
