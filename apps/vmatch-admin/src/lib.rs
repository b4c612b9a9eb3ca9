use std::path::PathBuf;

use clap::{
	Parser, Subcommand,
	builder::{
		Styles,
		styling::{AnsiColor, Effects},
	},
};
use color_eyre::eyre;
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;

use vmatch_config::Config;
use vmatch_domain::{
	liftover::{GenomeBuild, Liftover},
	xpos,
};
use vmatch_service::{SubmissionLinker, VariantMatcher};
use vmatch_storage::{db::Db, queries};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(
	version = VERSION,
	rename_all = "kebab",
	styles = styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Link every matchmaker submission feature to a saved variant.
	LinkSubmissions,
	/// Delete expired search cache entries.
	PurgeCache,
	/// Lift a GRCh37 position onto GRCh38 with the configured chain file.
	Lift {
		#[arg(long)]
		chrom: String,
		#[arg(long)]
		pos: u64,
	},
	Xpos {
		#[command(subcommand)]
		command: XposCommand,
	},
}

#[derive(Debug, Subcommand)]
pub enum XposCommand {
	Encode { chrom: String, pos: u64 },
	Decode { xpos: i64 },
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = vmatch_config::load(&args.config)?;

	init_tracing(&config)?;

	match args.command {
		Command::LinkSubmissions => link_submissions(&config).await,
		Command::PurgeCache => purge_cache(&config).await,
		Command::Lift { chrom, pos } => lift(&config, &chrom, pos),
		Command::Xpos { command } => convert_xpos(command),
	}
}

pub fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Red.on_default() | Effects::BOLD)
		.usage(AnsiColor::Red.on_default() | Effects::BOLD)
		.literal(AnsiColor::Blue.on_default() | Effects::BOLD)
		.placeholder(AnsiColor::Green.on_default())
}

fn init_tracing(config: &Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	Ok(())
}

async fn connect(config: &Config) -> color_eyre::Result<Db> {
	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	Ok(db)
}

fn load_liftover(config: &Config) -> color_eyre::Result<Liftover> {
	let Some(path) = &config.liftover.grch37_to_grch38_chain else {
		tracing::warn!("No GRCh37 to GRCh38 chain file configured. Liftover is disabled.");

		return Ok(Liftover::new());
	};
	let liftover = Liftover::new().load(GenomeBuild::GRCh37, GenomeBuild::GRCh38, path)?;

	tracing::info!(path = %path.display(), "Loaded GRCh37 to GRCh38 chain file.");

	Ok(liftover)
}

async fn link_submissions(config: &Config) -> color_eyre::Result<()> {
	let db = connect(config).await?;
	let liftover = load_liftover(config)?;
	let matcher = VariantMatcher::new(&liftover, &config.matchmaker.external_match_tag);
	let report = SubmissionLinker::new(&db, matcher).run().await?;

	println!("{}", serde_json::to_string_pretty(&report)?);

	Ok(())
}

async fn purge_cache(config: &Config) -> color_eyre::Result<()> {
	let db = connect(config).await?;
	let purged = queries::purge_expired_cache(&db.pool, OffsetDateTime::now_utc()).await?;

	tracing::info!(purged, "Purged expired search cache entries.");
	println!("{purged}");

	Ok(())
}

fn lift(config: &Config, chrom: &str, pos: u64) -> color_eyre::Result<()> {
	let liftover = load_liftover(config)?;

	if !liftover.supports(GenomeBuild::GRCh37, GenomeBuild::GRCh38) {
		return Err(eyre::eyre!("liftover.grch37_to_grch38_chain is not configured."));
	}

	let candidates = liftover.candidates(GenomeBuild::GRCh37, GenomeBuild::GRCh38, chrom, pos);

	if candidates.is_empty() {
		println!("No GRCh38 mapping for {chrom}:{pos}.");
	}

	for lifted in candidates {
		println!("{}\t{}\t{}", lifted.chrom, lifted.pos, lifted.chain_score);
	}

	Ok(())
}

fn convert_xpos(command: XposCommand) -> color_eyre::Result<()> {
	match command {
		XposCommand::Encode { chrom, pos } => println!("{}", xpos::get_xpos(&chrom, pos)?),
		XposCommand::Decode { xpos: encoded } => {
			let (chrom, pos) = xpos::get_chrom_pos(encoded)?;

			println!("{chrom}\t{pos}");
		},
	}

	Ok(())
}
