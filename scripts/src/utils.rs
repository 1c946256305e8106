use crate::config::AppConfig;
use anyhow::Context;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode},
};
use std::str::FromStr;

/// Names of the migrations to apply: `file` alone, or all of them sorted
fn migrations_to_apply(tera: &tera::Tera, file: Option<&str>) -> Vec<String> {
    if let Some(file) = file {
        return vec![file.to_string()];
    }

    let mut names = tera
        .get_template_names()
        .map(str::to_string)
        .collect::<Vec<_>>();
    names.sort();
    names
}

pub async fn run_migrations(
    db_pool: &SqlitePool,
    migrations_glob: &str,
    file: Option<&str>,
) -> anyhow::Result<()> {
    let mut tera = tera::Tera::new(migrations_glob)?;
    tera.autoescape_on(vec![".sql"]);

    for name in migrations_to_apply(&tera, file) {
        let migration = tera
            .render(&name, &tera::Context::new())
            .with_context(|| format!("failed to render migration {name}"))?;

        sqlx::raw_sql(&migration)
            .execute(db_pool)
            .await
            .with_context(|| format!("failed to apply migration {name}"))?;

        println!("applied {name}");
    }

    Ok(())
}

pub async fn setup_sqlite_db_pool(app_config: &AppConfig) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&app_config.db_host)?
        .create_if_missing(true)
        .pragma("foreign_keys", "ON");

    if app_config.is_prod() {
        return Ok(SqlitePool::connect_with(
            options
                .pragma("key", app_config.db_pass_encrypt.clone())
                .pragma("cipher_page_size", "1024")
                .pragma("kdf_iter", "64000")
                .pragma("cipher_hmac_algorithm", "HMAC_SHA1")
                .pragma("cipher_kdf_algorithm", "PBKDF2_HMAC_SHA1")
                .journal_mode(SqliteJournalMode::Delete),
        )
        .await?);
    }

    Ok(SqlitePool::connect_with(options).await?)
}
