use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = vmatch_admin::Args::parse();

	vmatch_admin::run(args).await
}
