use std::sync::Arc;

use humansize::{BINARY, format_size};
use lorafetch_engine::{Acquirer, CacheResolver, ResourceKind};
use tracing::{error, info};

use crate::config::ProgramConfig;
use crate::error::AppError;
use crate::utils::progress::ProgressManager;

fn resolver(config: &ProgramConfig) -> Result<CacheResolver, AppError> {
    let acquirer = Acquirer::with_config(config.fetcher.clone())?;
    Ok(CacheResolver::new(&config.cache_dir, acquirer)?)
}

/// Resolve every URL, printing `url<TAB>path` for each one that succeeds.
/// Failures are logged and counted; the remaining URLs are still attempted.
pub async fn fetch(
    urls: &[String],
    config: &ProgramConfig,
    progress: ProgressManager,
) -> Result<(), AppError> {
    let mut acquirer = Acquirer::with_config(config.fetcher.clone())?;
    if !progress.is_disabled() {
        acquirer = acquirer.with_progress(Arc::new(move |event| progress.handle_event(event)));
    }
    let resolver = CacheResolver::new(&config.cache_dir, acquirer)?;

    let total = urls.len();
    let mut failed = 0;
    info!(
        urls = total,
        cache_dir = ?config.cache_dir,
        "Resolving {} URL{}",
        total,
        if total == 1 { "" } else { "s" }
    );

    for url in urls {
        match resolver.resolve(url).await {
            Ok(path) => println!("{url}\t{}", path.display()),
            Err(e) => {
                error!(url = %url, kind = ?e.kind(), "Failed to fetch: {e}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(AppError::Incomplete { failed, total });
    }
    Ok(())
}

/// Print where each URL would be cached, without touching the network
pub fn path(urls: &[String], config: &ProgramConfig) -> Result<(), AppError> {
    let resolver = resolver(config)?;
    for url in urls {
        let target = resolver.target(url)?;
        println!("{url}\t{}", target.path.display());
    }
    Ok(())
}

pub async fn list(config: &ProgramConfig) -> Result<(), AppError> {
    let resolver = resolver(config)?;
    let entries = resolver.entries().await?;

    let mut total_size = 0;
    for entry in &entries {
        let kind = match entry.kind {
            ResourceKind::Direct => "direct",
            ResourceKind::Archive => "archive",
        };
        println!(
            "{:>10}  {:<7}  {}",
            format_size(entry.size, BINARY),
            kind,
            entry.path.display()
        );
        total_size += entry.size;
    }

    println!(
        "{} entr{}, {} total",
        entries.len(),
        if entries.len() == 1 { "y" } else { "ies" },
        format_size(total_size, BINARY)
    );
    Ok(())
}

pub async fn clear(urls: &[String], all: bool, config: &ProgramConfig) -> Result<(), AppError> {
    if !all && urls.is_empty() {
        return Err(AppError::InvalidInput(
            "pass one or more URLs, or --all".to_string(),
        ));
    }

    let resolver = resolver(config)?;
    let removed = if all {
        resolver.clear().await?
    } else {
        let mut removed = 0;
        for url in urls {
            removed += resolver.remove(url).await?;
        }
        removed
    };

    println!("Removed {removed} file(s) from {}", config.cache_dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::CliArgs;
    use clap::Parser;
    use lorafetch_engine::CacheKey;

    fn config_for(dir: &std::path::Path) -> ProgramConfig {
        let args = CliArgs::try_parse_from([
            "lorafetch",
            "--cache-dir",
            dir.to_str().unwrap(),
            "list",
        ])
        .unwrap();
        ProgramConfig::from_args(&args).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_counts_failures() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path());
        let progress = ProgressManager::new_disabled(indicatif::MultiProgress::new());

        let result = fetch(
            &["ftp://example.com/a.safetensors".to_string()],
            &config,
            progress,
        )
        .await;
        assert!(matches!(
            result,
            Err(AppError::Incomplete {
                failed: 1,
                total: 1
            })
        ));
    }

    #[tokio::test]
    async fn test_clear_url_and_all() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path());
        let url = "https://example.com/a.safetensors";
        let key = CacheKey::from_url(url);
        std::fs::write(
            dir.path()
                .join(key.to_filename(ResourceKind::Direct, "safetensors")),
            b"w",
        )
        .unwrap();
        std::fs::write(
            dir.path().join(
                CacheKey::from_url("https://example.com/b.tar")
                    .to_filename(ResourceKind::Archive, "safetensors"),
            ),
            b"w",
        )
        .unwrap();

        clear(&[url.to_string()], false, &config).await.unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        clear(&[], true, &config).await.unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_clear_requires_target() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path());
        assert!(matches!(
            clear(&[], false, &config).await,
            Err(AppError::InvalidInput(_))
        ));
    }
}
