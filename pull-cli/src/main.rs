use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use error::AppError;
use pull_engine::{
    ProxyConfig, ProxyType, PullConfig, ResourceCacheEngine, ResourceEvent,
};
use pull_ledger::{ResourceLedger, TransactionContext, TransactionalPlugin};
use tokio::sync::broadcast;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod cli;
mod error;
mod owner;

use cli::CliArgs;
use owner::LoggingOwner;

fn main() {
    if let Err(e) = bootstrap() {
        eprintln!("Error: {e}");
        // Log the full error for debugging
        error!(error = ?e, "Application failed");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn bootstrap() -> Result<(), AppError> {
    let args = CliArgs::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::Initialization(e.to_string()))?;

    let resources = args
        .resources
        .iter()
        .map(|spec| parse_resource(spec))
        .collect::<Result<Vec<_>, _>>()?;

    let config = build_config(&args)?;
    info!(
        cache_dir = %config.cache_dir().display(),
        probe_timeout_s = args.probe_timeout,
        fetch_timeout_s = args.fetch_timeout,
        "Pull configuration"
    );

    let engine = ResourceCacheEngine::new(config)?;
    let mut events = engine.subscribe();
    let mut ledger = ResourceLedger::new(
        args.owner.clone(),
        Arc::new(LoggingOwner),
        Arc::new(engine.clone()),
    );

    let checkpoint = match &args.checkpoint {
        Some(path) => read_checkpoint(path).await?,
        None => None,
    };
    ledger.restore_from_checkpoint(checkpoint.as_deref())?;

    // Every restored resource was re-added, so each one reports once.
    let mut expected: BTreeMap<String, usize> =
        ledger.list_aliases().into_iter().map(|alias| (alias, 1)).collect();

    let ctx = TransactionContext::new(format!("{}-{}", args.owner, std::process::id()));
    TransactionalPlugin::begin(&mut ledger, &ctx)?;
    for (alias, url) in &resources {
        ledger.declare(alias, url, &args.handler)?;
        *expected.entry(alias.clone()).or_default() += 1;
    }
    for alias in &args.refresh {
        ledger.force_refresh(alias)?;
        if let Some(count) = expected.get_mut(alias) {
            *count += 1;
        }
    }
    for alias in &args.remove {
        ledger.undeclare(alias)?;
        expected.remove(alias);
    }

    let snapshot = ledger.prepare_for_commit()?;
    if let Some(path) = &args.checkpoint {
        write_checkpoint(path, &snapshot).await?;
        debug!(path = %path.display(), bytes = snapshot.len(), "Checkpoint written");
    }
    TransactionalPlugin::commit(&mut ledger)?;

    if expected.is_empty() {
        info!(owner = %args.owner, "No resources to wait for");
        return Ok(());
    }

    let result = wait_for_reports(
        &mut events,
        &args.owner,
        expected,
        Duration::from_secs(args.wait),
    )
    .await;

    if let Err(AppError::OwnerFailure(_)) = &result {
        let removed = ledger.teardown();
        warn!(owner = %args.owner, removed, "Owner torn down");
    }

    for alias in ledger.list_aliases() {
        if let Some(descriptor) = ledger.get(&alias) {
            info!(
                alias = %descriptor.alias,
                url = %descriptor.url,
                version = descriptor.current_version.as_deref().unwrap_or("-"),
                path = ?descriptor.cached_path,
                "Resource state"
            );
        }
    }

    result
}

fn build_config(args: &CliArgs) -> Result<PullConfig, AppError> {
    let mut builder = PullConfig::builder()
        .with_cache_root(&args.cache_root)
        .with_cache_subdir(&args.subdir)
        .with_probe_timeout(Duration::from_secs(args.probe_timeout))
        .with_fetch_timeout(Duration::from_secs(args.fetch_timeout))
        .with_connect_timeout(Duration::from_secs(args.connect_timeout))
        .with_max_redirects(args.max_redirects);

    for header in &args.headers {
        let (name, value) = parse_header(header)?;
        builder = builder.with_header(name, value);
    }

    // Handle proxy configuration
    if args.no_proxy {
        info!("All proxy settings disabled (--no-proxy flag)");
        builder = builder.with_system_proxy(false);
    } else if let Some(proxy_url) = args.proxy.as_ref() {
        let proxy_type: ProxyType = args.proxy_type.parse()?;
        let mut proxy = ProxyConfig::new(proxy_url.clone(), proxy_type);

        // Configure proxy authentication if both username and password are provided
        if let (Some(username), Some(password)) = (&args.proxy_user, &args.proxy_pass) {
            proxy = proxy.with_auth(username.clone(), password.clone());
        }

        info!(
            proxy_url = %proxy_url,
            proxy_type = ?proxy_type,
            has_auth = proxy.auth.is_some(),
            "Using explicit proxy configuration"
        );

        builder = builder.with_proxy(proxy);
    } else {
        builder = builder.with_system_proxy(args.use_system_proxy);
    }

    Ok(builder.build())
}

/// Split `alias=url`.
fn parse_resource(spec: &str) -> Result<(String, String), AppError> {
    match spec.split_once('=') {
        Some((alias, url)) if !alias.trim().is_empty() && !url.trim().is_empty() => {
            Ok((alias.trim().to_string(), url.trim().to_string()))
        }
        _ => Err(AppError::InvalidInput(format!(
            "Invalid resource '{spec}', expected alias=url"
        ))),
    }
}

/// Split `Name: Value`.
fn parse_header(header: &str) -> Result<(&str, &str), AppError> {
    match header.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim(), value.trim())),
        _ => Err(AppError::InvalidInput(format!(
            "Invalid header format: '{header}', expected 'Name: Value'"
        ))),
    }
}

async fn read_checkpoint(path: &Path) -> Result<Option<Vec<u8>>, AppError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            info!(path = %path.display(), "Restoring from checkpoint");
            Ok(Some(bytes))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn write_checkpoint(path: &Path, snapshot: &[u8]) -> Result<(), AppError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".part");
    tokio::fs::write(&tmp, snapshot).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Wait until each alias in `expected` has reported as many completed jobs
/// as were queued for it.
async fn wait_for_reports(
    events: &mut broadcast::Receiver<ResourceEvent>,
    owner_id: &str,
    mut expected: BTreeMap<String, usize>,
    wait: Duration,
) -> Result<(), AppError> {
    let deadline = tokio::time::Instant::now() + wait;

    while !expected.is_empty() {
        let event = tokio::select! {
            received = tokio::time::timeout_at(deadline, events.recv()) => received,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, not waiting for remaining resources");
                return Ok(());
            }
        };

        let event = match event {
            Ok(Ok(event)) => event,
            Ok(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                warn!(skipped, "Missed engine events");
                continue;
            }
            Ok(Err(broadcast::error::RecvError::Closed)) => break,
            Err(_) => {
                let pending: Vec<_> = expected.keys().cloned().collect();
                warn!(?pending, "Timed out waiting for resources");
                break;
            }
        };

        let key = event.key();
        if key.owner_id != owner_id {
            continue;
        }

        match &event {
            ResourceEvent::Updated {
                key,
                version,
                path,
                outcome,
            } => {
                info!(alias = %key.alias, version = %version, path = %path.display(), outcome = ?outcome, "Resource ready");
            }
            ResourceEvent::Failed { key, url, error } => {
                warn!(alias = %key.alias, url = %url, error = %error, "Resource failed");
            }
            ResourceEvent::OwnerFailure { error, .. } => {
                return Err(AppError::OwnerFailure(error.clone()));
            }
        }

        if let Some(count) = expected.get_mut(&key.alias) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                expected.remove(&key.alias);
            }
        }
    }

    Ok(())
}
