//! skiff のログイン情報と設定ファイルの管理
//!
//! `skiff login` で保存したコンテキスト（API URL・トークン・ホームレジストリ・
//! ビルドホスト）を `~/.skiff/context.json` に永続化します。

pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// コンテキストファイル名
const CONTEXT_FILE: &str = "context.json";

/// ビルドデーモンの既定ポート
const DEFAULT_BUILD_PORT: u16 = 1234;

/// skiff のホームディレクトリを取得
///
/// 以下の優先順位で決定:
/// 1. 環境変数 SKIFF_HOME
/// 2. ~/.skiff
pub fn skiff_home() -> Result<PathBuf> {
    let home = match std::env::var("SKIFF_HOME") {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::home_dir()
            .ok_or(ConfigError::HomeDirNotFound)?
            .join(".skiff"),
    };

    if !home.exists() {
        std::fs::create_dir_all(&home)?;
    }

    Ok(home)
}

/// コンテキストファイルのパス
pub fn context_path() -> Result<PathBuf> {
    Ok(skiff_home()?.join(CONTEXT_FILE))
}

/// ログイン済みのコンテキスト
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    /// API のベース URL（例: "https://cloud.example.com"）
    pub url: String,
    /// セッショントークン
    pub token: String,
    /// ユーザーID（ホームレジストリのユーザー名として使う）
    pub user_id: String,
    /// 表示用のユーザー名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// ホームレジストリ（省略時は `registry.<API ホスト>`）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
    /// ビルドデーモンのアドレス（省略時は `tcp://buildkit.<API ホスト>:1234`）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_host: Option<String>,
}

impl Context {
    /// 新しいコンテキストを作成
    ///
    /// URL からホスト名を取り出せない場合はエラー
    pub fn new(url: &str, token: &str, user_id: &str) -> Result<Self> {
        let url = url.trim_end_matches('/').to_string();
        api_host(&url)?;

        Ok(Self {
            url,
            token: token.to_string(),
            user_id: user_id.to_string(),
            username: None,
            registry: None,
            build_host: None,
        })
    }

    /// ホームレジストリのアドレス
    pub fn registry(&self) -> Result<String> {
        if let Some(registry) = self.registry.as_deref().filter(|r| !r.is_empty()) {
            return Ok(registry.to_string());
        }
        Ok(format!("registry.{}", api_host(&self.url)?))
    }

    /// ビルドデーモンのアドレス
    pub fn build_host(&self) -> Result<String> {
        if let Some(host) = self.build_host.as_deref().filter(|h| !h.is_empty()) {
            return Ok(host.to_string());
        }
        Ok(format!(
            "tcp://buildkit.{}:{}",
            api_host(&self.url)?,
            DEFAULT_BUILD_PORT
        ))
    }
}

/// API URL からホスト名を取り出す
///
/// スキームを省略した場合は `https://` として扱う
///
/// # Examples
/// - `https://cloud.example.com` -> `cloud.example.com`
/// - `https://cloud.example.com:8443/api?team=a` -> `cloud.example.com`
/// - `https://[::1]:8443` -> `[::1]`
pub fn api_host(url: &str) -> Result<String> {
    let parsed = if url.contains("://") {
        Url::parse(url)
    } else {
        Url::parse(&format!("https://{}", url))
    }
    .map_err(|_| ConfigError::InvalidUrl(url.to_string()))?;

    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(host.to_string()),
        _ => Err(ConfigError::InvalidUrl(url.to_string())),
    }
}

/// 保存済みのコンテキストを読み込み
pub fn load_context() -> Result<Context> {
    let path = context_path()?;
    if !path.exists() {
        return Err(ConfigError::NotLoggedIn(path));
    }

    let content = std::fs::read_to_string(&path)?;
    let context = serde_json::from_str(&content)
        .map_err(|source| ConfigError::InvalidContext { path, source })?;

    Ok(context)
}

/// コンテキストを保存
///
/// トークンを含むため、Unix では 0600 で書き込む
pub fn save_context(context: &Context) -> Result<PathBuf> {
    let path = context_path()?;
    let content = serde_json::to_string_pretty(context)?;
    std::fs::write(&path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;
    }

    tracing::debug!("Saved login context to {}", path.display());
    Ok(path)
}
