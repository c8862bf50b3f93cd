//! ビルドデーモンの接続先

use crate::error::{BuildError, BuildResult};
use bollard::{API_DEFAULT_VERSION, Docker};
use skiff_config::Context;

/// 接続タイムアウト（秒）
const CONNECT_TIMEOUT_SECS: u64 = 120;

/// ビルドホストを決定
///
/// 以下の優先順位:
/// 1. 環境変数 SKIFF_BUILD_HOST
/// 2. ログイン情報のビルドホスト
pub fn resolve_build_host(context: Option<&Context>) -> BuildResult<String> {
    if let Ok(host) = std::env::var("SKIFF_BUILD_HOST")
        && !host.is_empty()
    {
        return Ok(host);
    }

    match context {
        Some(context) => Ok(context.build_host()?),
        None => Err(BuildError::NoBuildHost),
    }
}

/// ビルドデーモンに接続
///
/// - `unix:///path/to/docker.sock`
/// - `tcp://host:port` / `http://host:port`
pub fn connect(host: &str) -> BuildResult<Docker> {
    if let Some(path) = host.strip_prefix("unix://") {
        tracing::debug!("Connecting to build daemon over unix socket: {}", path);
        return Ok(Docker::connect_with_unix(
            path,
            CONNECT_TIMEOUT_SECS,
            API_DEFAULT_VERSION,
        )?);
    }

    if host.starts_with("tcp://") || host.starts_with("http://") {
        tracing::debug!("Connecting to build daemon over http: {}", host);
        return Ok(Docker::connect_with_http(
            host,
            CONNECT_TIMEOUT_SECS,
            API_DEFAULT_VERSION,
        )?);
    }

    Err(BuildError::InvalidConfig(format!(
        "Unsupported build host '{}' (expected unix://, tcp:// or http://)",
        host
    )))
}
