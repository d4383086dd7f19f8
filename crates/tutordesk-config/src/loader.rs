// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./tutordesk.toml` > `~/.config/tutordesk/tutordesk.toml`
//! > `/etc/tutordesk/tutordesk.toml` with environment variable overrides via the
//! `TUTORDESK_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::TutorDeskConfig;

/// Config sections addressable from environment variables.
const SECTIONS: &[&str] = &[
    "service",
    "pachca",
    "telegram",
    "tracker",
    "storage",
    "gateway",
    "roles",
    "grouping",
    "escalation",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/tutordesk/tutordesk.toml` (system-wide)
/// 3. `~/.config/tutordesk/tutordesk.toml` (user XDG config)
/// 4. `./tutordesk.toml` (local directory)
/// 5. `TUTORDESK_*` environment variables
pub fn load_config() -> Result<TutorDeskConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<TutorDeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TutorDeskConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<TutorDeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TutorDeskConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(TutorDeskConfig::default()))
        .merge(Toml::file("/etc/tutordesk/tutordesk.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("tutordesk/tutordesk.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("tutordesk.toml"))
        .merge(env_provider())
}

/// Environment provider mapping `TUTORDESK_<SECTION>_<KEY>` to `section.key`.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `TUTORDESK_ESCALATION_RESPONSE_SLA_SECS` must become
/// `escalation.response_sla_secs`.
fn env_provider() -> Env {
    Env::prefixed("TUTORDESK_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a prefix-stripped env var name (any case) to a dotted config path.
pub fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key
}
