//! Catalog HTTP service entry point.
//!
//! # Purpose
//! Wires configuration, storage, caching, file uploads and token keys, then
//! starts the API server alongside the metrics listener.
//!
//! # Notes
//! The `build_state` helper keeps wiring testable and minimizes main setup logic.
use anyhow::Context;
use catalog::app::{AppState, build_router, with_file_serving};
use catalog::auth::capability::CapabilityTokenService;
use catalog::auth::keys::SigningKey;
use catalog::auth::policy::ClaimsAuthorizer;
use catalog::cache::InMemoryResponseCache;
use catalog::config::CatalogConfig;
use catalog::files::LocalFileStore;
use catalog::hypermedia::LinkBuilder;
use catalog::observability;
use catalog::query::author_sort_fields;
use catalog::store::memory::InMemoryStore;
use std::future::Future;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CatalogConfig::from_env_or_yaml().context("catalog config")?;
    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

async fn run_with_shutdown<F>(config: CatalogConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics_handle = observability::init_observability("catalog");
    let state = build_state(&config)?;
    tracing::info!(backend = state.store.backend_name(), "catalog store ready");
    let metrics_task = tokio::spawn(observability::serve_metrics(
        metrics_handle,
        config.metrics_bind,
    ));

    let app = with_file_serving(build_router(state), &config.files_root);

    let addr = config.bind_addr;
    tracing::info!(%addr, public_url = %config.public_url, "catalog listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tokio::pin!(shutdown);
    tokio::select! {
        result = axum::serve(listener, app.into_make_service()) => {
            result?;
        }
        _ = &mut shutdown => {}
    }

    metrics_task.abort();
    let _ = metrics_task.await;
    Ok(())
}

fn build_state(config: &CatalogConfig) -> anyhow::Result<AppState> {
    let signing_key = match config.signing_seed.as_deref() {
        Some(seed) => SigningKey::from_hex_seed(seed).context("parse CATALOG_SIGNING_SEED")?,
        None => {
            tracing::warn!("no signing seed configured; issued tokens will not survive a restart");
            SigningKey::generate().context("generate signing key")?
        }
    };
    let signing_key = Arc::new(signing_key);

    Ok(AppState {
        store: Arc::new(InMemoryStore::new()),
        cache: Arc::new(InMemoryResponseCache::with_capacity(
            config.cache_ttl,
            config.cache_capacity,
        )),
        files: Arc::new(LocalFileStore::new(
            config.files_root.clone(),
            &config.public_url,
        )),
        authorizer: Arc::new(ClaimsAuthorizer),
        capabilities: CapabilityTokenService::new(signing_key.clone(), config.capability_ttl),
        signing_key,
        links: LinkBuilder::new(config.public_url.clone()),
        author_sorts: author_sort_fields(),
    })
}
