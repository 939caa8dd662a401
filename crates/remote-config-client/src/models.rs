// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Payload types returned by the remote configuration API.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Configuration document served for an application.
///
/// Unknown fields are ignored. The document is not trusted until its
/// `signature` has been checked against the public key named by `key_id`;
/// that check happens outside this crate.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Key/value configuration entries.
    pub body: BTreeMap<String, String>,
    /// Identifier of the public key that signed this document.
    #[serde(rename = "keyId")]
    pub key_id: String,
    /// Value of the `Signature` response header, when the server sent one.
    #[serde(skip)]
    pub signature: Option<String>,
}

impl Config {
    /// Returns the configuration value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.body.get(key).map(String::as_str)
    }
}
