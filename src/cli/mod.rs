mod commands;
mod import;
mod init;
mod pipeline;
mod ranks;

pub use commands::{CommonArgs, Commands};
pub use import::run_import;
pub use init::run_init;
pub use pipeline::{run_dedupe_command, run_pipeline_command, run_rank_command};
pub use ranks::run_ranks;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::store::SqliteStore;

/// Loads the config for `common`, applying the data directory from the command line.
pub fn load_config(common: &CommonArgs) -> anyhow::Result<Config> {
    Config::load(&common.data_dir, common.config.as_deref()).map_err(Into::into)
}

/// Initialize store from data directory, checking it exists
pub fn init_store(config: &Config) -> anyhow::Result<SqliteStore> {
    let db_path = config.db_path();

    if !db_path.exists() {
        anyhow::bail!(
            "Database not found at {}. Run 'tearank init' first.",
            db_path.display()
        );
    }

    SqliteStore::new(&db_path).map_err(Into::into)
}

/// Runs one command to completion. Blocking; call from a blocking thread.
pub fn dispatch(command: Commands, cancel: &CancellationToken) -> anyhow::Result<()> {
    match command {
        Commands::Init { common } => run_init(&common),
        Commands::Import { common, file } => run_import(&common, &file),
        Commands::Dedupe { common, dry_run } => run_dedupe_command(&common, dry_run),
        Commands::Rank { common } => run_rank_command(&common, cancel),
        Commands::Run { common, dry_run } => run_pipeline_command(&common, dry_run, cancel),
        Commands::Ranks {
            common,
            run,
            limit,
            json,
        } => run_ranks(&common, run, limit, json),
    }
}
