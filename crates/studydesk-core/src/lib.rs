pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod render;
pub mod storage;
pub mod store;
pub mod task;
pub mod views;

use std::ffi::OsString;
use std::io;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};

#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let pre = cli::preprocess_args(&raw_args)?;
    let cli = cli::GlobalCli::parse_from(pre.cleaned_args);

    cli::init_tracing(cli.verbose, cli.quiet)?;

    info!(
        verbose = cli.verbose,
        quiet = cli.quiet,
        "starting studydesk"
    );
    debug!(?pre.rc_overrides, "preprocessed rc overrides");

    let mut cfg = config::Config::load(cli.rc_file.as_deref())?;
    cfg.apply_overrides(
        pre.rc_overrides
            .into_iter()
            .chain(cli.rc_overrides.into_iter().map(|kv| (kv.key, kv.value))),
    );

    let data_dir = config::resolve_data_dir(&cfg, cli.data.as_deref());
    let storage = storage::FileStorage::open(&data_dir)
        .with_context(|| format!("failed to open storage at {}", data_dir.display()))?;

    let timezone = datetime::resolve_timezone(cfg.get("timezone").as_deref());
    let clock = store::SystemClock::new(timezone);
    let key = cfg.storage_key()?;
    let mut store = store::TaskStore::open(storage, clock, &key);

    let renderer = render::Renderer::new(&cfg)?;
    let command = match cli.command {
        Some(command) => command,
        None => {
            let name = cfg
                .get("default.command")
                .unwrap_or_else(|| "dashboard".to_string());
            cli::Command::from_default_name(&name)?
        }
    };

    let mut out = io::stdout().lock();
    commands::dispatch(&mut store, &cfg, &renderer, &mut out, command)?;

    info!("done");
    Ok(())
}
