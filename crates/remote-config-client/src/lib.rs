// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Client side of the remote configuration refresh pipeline.
//!
//! The crate polls a configuration endpoint on a clamped interval
//! ([`poller`]), fetches and decodes the configuration document ([`http`])
//! and resolves the public key that signed it ([`public_key`]). Verifying the
//! signature and caching the last good configuration are left to the host.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod config;
pub mod http;
pub mod models;
pub mod poller;
pub mod public_key;

pub use config::{ClientEnv, ConfigError};
pub use http::{
    ClientSettings, ConfigApiClient, ErrorKind, FetchError, FetchOutcome, PathFetcher,
    RawResponse,
};
pub use models::Config;
pub use poller::{AsyncPoller, PollerState, MIN_POLL_INTERVAL};
pub use public_key::{KeyRecord, PublicKeyFetcher};
