// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::env;

use remote_config_client::{AsyncPoller, ClientEnv, ConfigApiClient};
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
pub async fn main() {
    let log_level = env::var("RC_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    let env_filter = format!("h2=off,hyper=off,rustls=off,{}", log_level);

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let client_env = ClientEnv::from_os_env();
    let settings = match client_env.to_settings() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Invalid remote config settings: {e}. Shutting down.");
            return;
        }
    };
    let client = match ConfigApiClient::new(settings) {
        Ok(client) => client,
        Err(e) => {
            error!("Unable to build remote config client: {e}. Shutting down.");
            return;
        }
    };

    let runtime = Handle::current();
    let poller = AsyncPoller::new(client_env.poll_interval_seconds, runtime.clone());
    info!(
        "Polling remote config for app {} every {:?}",
        client.app_id(),
        poller.interval()
    );

    poller.start(move || {
        let client = client.clone();
        runtime.spawn(async move {
            let config = match client.fetch_config().await {
                Ok(config) => config,
                Err(e) => {
                    error!("Failed to fetch remote config: {e}");
                    return;
                }
            };
            if config.signature.is_none() {
                warn!("Remote config response carried no signature");
            }
            match client.fetch_public_key(&config.key_id).await {
                Ok(key) => info!(
                    "Fetched remote config with {} entries signed by key {} ({} bytes of key material)",
                    config.body.len(),
                    config.key_id,
                    key.len()
                ),
                Err(e) => error!("Failed to fetch public key {}: {e}", config.key_id),
            }
        });
    });

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Unable to listen for shutdown signal: {e}");
    }
    debug!("Shutting down remote config poller");
}
