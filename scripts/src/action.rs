use clap::{Args, Parser, Subcommand};
use envconfig::Envconfig;

use crate::{config, utils};

#[derive(Args, Debug, Clone)]
pub struct RunMigrationsArgs {
    /// Migration to apply, e.g. `0001_broadcast.sql`. Applies every
    /// migration in name order when omitted.
    #[arg(short, long)]
    file: Option<String>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Action {
    RunMigrations(RunMigrationsArgs),
}

/// Maintenance tasks for the broadcast gateway database
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct AppArgs {
    #[command(subcommand)]
    pub action: Action,
}

impl AppArgs {
    pub async fn run(&self) -> anyhow::Result<()> {
        let app_config = config::AppConfig::init_from_env()?;

        match &self.action {
            Action::RunMigrations(RunMigrationsArgs { file }) => {
                let db_pool = utils::setup_sqlite_db_pool(&app_config).await?;

                utils::run_migrations(&db_pool, &app_config.migrations_glob, file.as_deref())
                    .await
            }
        }
    }
}
