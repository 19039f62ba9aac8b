// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SwipesBlue

use std::{error::Error, fs::File, io::BufReader, sync::Arc, time::Duration};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use swipesblue_server::{
    api::router,
    auth::{ApiKey, INTERNAL_PLATFORM, WILDCARD_PERMISSION},
    config::Config,
    state::AppState,
    storage::{ApiKeyStore, InMemoryApiKeyStore, RedbApiKeyStore},
    telemetry::init_tracing,
    tiers::EntitlementMatrix,
    webhooks::{DeliveryConfig, PartnerWebhookReceiver, WebhookRetryWorker, WebhookService},
};

/// Time allowed for in-flight requests once a shutdown signal arrives.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

type BoxError = Box<dyn Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Install the ring crypto provider for rustls (must be done before any TLS operations)
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| "failed to install rustls crypto provider")?;

    let config = Config::from_env()?;
    init_tracing(config.log_format);

    let store = open_store(&config)?;
    if let Some(token) = &config.bootstrap_api_key {
        seed_bootstrap_key(store.as_ref(), token)?;
    }

    let entitlements = match &config.entitlements_path {
        Some(path) => {
            let matrix = EntitlementMatrix::from_json_reader(BufReader::new(File::open(path)?))?;
            info!(path = %path.display(), records = matrix.len(), "Loaded entitlement matrix");
            matrix
        }
        None => EntitlementMatrix::standard().clone(),
    };

    let receiver = PartnerWebhookReceiver::new(config.partner_webhook_secret.clone());
    if !receiver.is_configured() {
        warn!("PARTNER_WEBHOOK_SECRET is not set; inbound partner webhooks will be rejected");
    }

    let webhooks = WebhookService::new(DeliveryConfig::default())?;
    let state = AppState::new(store, webhooks.clone())
        .with_lookup_timeout(config.api_key_lookup_timeout)
        .with_entitlements(entitlements)
        .with_partner_webhooks(receiver);

    let shutdown = CancellationToken::new();
    let worker = WebhookRetryWorker::new(webhooks).with_interval(config.webhook_retry_interval);
    let worker_handle = tokio::spawn(worker.run(shutdown.clone()));

    let handle = Handle::new();
    let signal_handle = handle.clone();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown signal received, draining connections");
        signal_shutdown.cancel();
        signal_handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
    });

    let app = router(state);
    let addr = config.bind_addr()?;

    match &config.tls {
        Some(tls) => {
            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;
            info!(%addr, "SwipesBlue server listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            info!(%addr, "SwipesBlue server listening on http (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
    }

    shutdown.cancel();
    worker_handle.await?;
    info!("Server stopped");
    Ok(())
}

fn open_store(config: &Config) -> Result<Arc<dyn ApiKeyStore>, BoxError> {
    match &config.api_key_db_path {
        Some(path) => {
            let store = RedbApiKeyStore::open(path)?;
            info!(path = %path.display(), "Opened API key database");
            Ok(Arc::new(store))
        }
        None => {
            warn!("API_KEY_DB_PATH is not set; API keys are kept in memory only");
            Ok(Arc::new(InMemoryApiKeyStore::new()))
        }
    }
}

/// Ensure an internal wildcard key exists for `token`.
fn seed_bootstrap_key(store: &dyn ApiKeyStore, token: &str) -> Result<(), BoxError> {
    if store.find_by_key(token)?.is_some() {
        return Ok(());
    }
    let key = ApiKey::with_token(token, INTERNAL_PLATFORM, "bootstrap", [WILDCARD_PERMISSION]);
    info!(key_id = %key.id, key = %key.redacted(), "Seeded bootstrap API key");
    store.insert(key)?;
    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
