pub mod actions;
pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod detail;
pub mod form;
pub mod http;
pub mod memory;
pub mod notice;
pub mod query;
pub mod render;
pub mod surface;
pub mod view;
pub mod wizard;

#[cfg(test)]
mod testing;

use std::ffi::OsString;

use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting taskdeck CLI"
  );
  debug!(
    overrides = cli.rc_overrides.len(),
    "collected rc overrides"
  );

  let mut cfg = config::Config::load(
    cli.rc_file.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .rc_overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
  );

  let renderer =
    render::Renderer::new(&cfg)?;

  commands::dispatch(
    &cfg,
    &renderer,
    cli.command
  )?;

  info!("done");
  Ok(())
}
