//! `buildscan serve` - runs the detection HTTP server.

use anyhow::Result;
use buildscan_core::AppConfig;
use buildscan_jobs::{JobManager, Runtime};
use clap::Args;
use std::sync::Arc;

use crate::server;

#[derive(Args, Debug)]
pub struct Subcommand {
	/// Override the tile source URL template (must contain {z}, {x}, {y})
	#[arg(long)]
	tile_url: Option<String>,
}

pub fn run(args: &Subcommand) -> Result<()> {
	let rt = tokio::runtime::Runtime::new()?;
	rt.block_on(run_async(args))
}

async fn run_async(args: &Subcommand) -> Result<()> {
	let config = AppConfig::from_env()?;
	let mut builder = Runtime::builder().config(config.clone());
	if let Some(url) = &args.tile_url {
		builder = builder.tile_url_template(url.clone());
	}
	let runtime = Arc::new(builder.build()?);
	let manager = Arc::new(JobManager::new(
		config.max_concurrent_jobs,
		config.job_id_min_length,
		config.job_id_max_length,
	));

	let _cleanup = buildscan_jobs::spawn_cleanup_sweep(manager.clone(), config.job_cleanup_interval);

	let app = server::build_router(manager, runtime, config.clone());
	let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
	log::info!("listening on {}:{}", config.host, config.port);
	axum::serve(listener, app).await?;
	Ok(())
}
