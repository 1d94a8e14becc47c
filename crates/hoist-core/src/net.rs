use anyhow::{Context, Result};
use reqwest::blocking::Client;

use crate::config::{EnvSnapshot, NetworkConfig};

const USER_AGENT: &str = concat!("hoist/", env!("CARGO_PKG_VERSION"));

/// Decide whether hoist should honor standard proxy environment variables.
///
/// Behavior:
/// - `HOIST_KEEP_PROXIES=1/true/yes/on` forces proxies on.
/// - `HOIST_KEEP_PROXIES=0/false/no/off/""` forces proxies off.
/// - If unset, proxies are enabled only when at least one proxy env var is set.
pub(crate) fn keep_proxies(snapshot: &EnvSnapshot) -> bool {
    match snapshot.var("HOIST_KEEP_PROXIES") {
        Some(raw) => {
            let value = raw.trim().to_ascii_lowercase();
            !matches!(value.as_str(), "" | "0" | "false" | "no" | "off")
        }
        None => {
            const PROXY_KEYS: &[&str] = &[
                "HTTP_PROXY",
                "http_proxy",
                "HTTPS_PROXY",
                "https_proxy",
                "ALL_PROXY",
                "all_proxy",
            ];
            PROXY_KEYS.iter().any(|key| {
                snapshot
                    .var(key)
                    .is_some_and(|value| !value.trim().is_empty())
            })
        }
    }
}

pub(crate) fn http_client(network: &NetworkConfig) -> Result<Client> {
    let mut builder = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(network.timeout);
    if !network.keep_proxies {
        builder = builder.no_proxy();
    }
    builder.build().context("failed to build http client")
}
