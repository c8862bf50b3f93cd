//! ローカル認証情報ストア
//!
//! Docker の config.json を読み込み、レジストリホスト -> 認証情報 のテーブルとして保持します。
//! `credsStore` / `credHelpers` が設定されている場合は credential helper を呼び出します。

use crate::error::{AuthError, Result};
use base64::Engine;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// credential helper が identity token を返すときのユーザー名
const TOKEN_USERNAME: &str = "<token>";

/// credential helper が「見つからない」ときに返すメッセージ
const HELPER_NOT_FOUND: &str = "credentials not found in native keychain";

/// Docker config.json の構造
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DockerConfig {
    /// 認証情報 (レジストリ -> AuthEntry)
    #[serde(default)]
    auths: HashMap<String, AuthEntry>,
    /// 全レジストリ共通の credential helper 名 (例: "osxkeychain", "desktop")
    #[serde(default)]
    creds_store: Option<String>,
    /// レジストリ個別の credential helper
    #[serde(default)]
    cred_helpers: HashMap<String, String>,
}

/// 認証エントリ
#[derive(Debug, Default, Deserialize)]
struct AuthEntry {
    /// Base64エンコードされた "username:password"
    auth: Option<String>,
    username: Option<String>,
    password: Option<String>,
    identitytoken: Option<String>,
}

/// credential helper からのレスポンス
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HelperResponse {
    username: String,
    secret: String,
}

/// ストアに保存された1件の認証情報
#[derive(Clone, PartialEq, Eq)]
pub enum StoredCredential {
    /// ユーザー名とパスワード
    Basic { username: String, password: String },
    /// identity token（ユーザー名なし）
    IdentityToken(String),
}

impl fmt::Debug for StoredCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoredCredential::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            StoredCredential::IdentityToken(_) => {
                f.debug_tuple("IdentityToken").field(&"<redacted>").finish()
            }
        }
    }
}

/// 起動時に一度だけ読み込まれる認証情報テーブル
///
/// 読み込み後は変更しない。
#[derive(Debug, Default)]
pub struct CredentialStore {
    path: PathBuf,
    entries: HashMap<String, StoredCredential>,
    creds_store: Option<String>,
    cred_helpers: HashMap<String, String>,
}

impl CredentialStore {
    /// デフォルトの config.json のパス
    ///
    /// `$DOCKER_CONFIG/config.json`、未設定なら `~/.docker/config.json`
    pub fn default_path() -> PathBuf {
        std::env::var("DOCKER_CONFIG")
            .ok()
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|h| h.join(".docker"))
                    .unwrap_or_else(|| PathBuf::from(".docker"))
            })
            .join("config.json")
    }

    /// デフォルトの場所から読み込み
    pub fn load_default() -> Result<Self> {
        Self::load(&Self::default_path())
    }

    /// 指定したパスの config.json を読み込み
    ///
    /// ファイルが存在しない場合は空のストアとして扱う（Docker CLI と同じ挙動）。
    /// 読めない・解析できない場合はエラー。
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("Docker config.json not found at {}", path.display());
            return Ok(Self {
                path: path.to_path_buf(),
                ..Default::default()
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| AuthError::Load {
            path: path.to_path_buf(),
            message: format!("Failed to read config.json: {}", e),
        })?;

        Self::parse(&content, path)
    }

    /// config.json の内容を解析
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let load_error = |message: String| AuthError::Load {
            path: path.to_path_buf(),
            message,
        };

        let config: DockerConfig = serde_json::from_str(content)
            .map_err(|e| load_error(format!("Failed to parse config.json: {}", e)))?;

        let mut entries = HashMap::with_capacity(config.auths.len());
        for (host, entry) in config.auths {
            let credential = decode_entry(&entry)
                .map_err(|message| load_error(format!("Invalid entry for {}: {}", host, message)))?;
            // credsStore 利用時は空のエントリ `{}` が書かれる
            if let Some(credential) = credential {
                entries.insert(host, credential);
            }
        }

        tracing::debug!(
            "Loaded {} credential entries from {}",
            entries.len(),
            path.display()
        );

        Ok(Self {
            path: path.to_path_buf(),
            entries,
            creds_store: config.creds_store.filter(|s| !s.is_empty()),
            cred_helpers: config.cred_helpers,
        })
    }

    /// 読み込み元のパス
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// ホストの認証情報を取得
    ///
    /// 検索順序:
    /// 1. `credHelpers` に個別指定された helper
    /// 2. `credsStore` の helper
    /// 3. `auths` セクション
    ///
    /// helper を呼び出す可能性があるため、呼び出し側で直列化すること。
    pub fn get(&self, host: &str) -> Result<StoredCredential> {
        let helper = self
            .cred_helpers
            .get(host)
            .or(self.creds_store.as_ref())
            .filter(|h| !h.is_empty());

        if let Some(helper) = helper {
            tracing::debug!("Trying credential helper {} for {}", helper, host);
            if let Some(credential) = run_helper(helper, host)? {
                return Ok(credential);
            }
        }

        self.entries
            .get(host)
            .cloned()
            .ok_or_else(|| AuthError::NotFound {
                host: host.to_string(),
            })
    }

    /// `auths` に登録されたホスト一覧
    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// auths エントリを認証情報に変換
///
/// identity token は空文字なら無いものとして扱う。
fn decode_entry(entry: &AuthEntry) -> std::result::Result<Option<StoredCredential>, String> {
    if let Some(token) = entry.identitytoken.as_deref().filter(|t| !t.is_empty()) {
        return Ok(Some(StoredCredential::IdentityToken(token.to_string())));
    }

    if let Some(auth_b64) = entry.auth.as_deref().filter(|a| !a.is_empty()) {
        let (username, password) = decode_auth(auth_b64)?;
        return Ok(Some(StoredCredential::Basic { username, password }));
    }

    match (&entry.username, &entry.password) {
        (Some(username), Some(password)) => Ok(Some(StoredCredential::Basic {
            username: username.clone(),
            password: password.clone(),
        })),
        _ => Ok(None),
    }
}

/// Base64エンコードされた "username:password" をデコード
fn decode_auth(auth_b64: &str) -> std::result::Result<(String, String), String> {
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(auth_b64)
        .map_err(|e| format!("Failed to decode auth: {}", e))?;

    let auth_str = String::from_utf8(decoded).map_err(|e| format!("Invalid UTF-8 in auth: {}", e))?;

    auth_str
        .split_once(':')
        .map(|(u, p)| (u.to_string(), p.to_string()))
        .ok_or_else(|| "auth is not in username:password form".to_string())
}

/// credential helper から認証情報を取得
///
/// helper が認証情報を持っていない場合は `Ok(None)`
fn run_helper(helper: &str, host: &str) -> Result<Option<StoredCredential>> {
    let helper_cmd = format!("docker-credential-{}", helper);
    let helper_error = |message: String| AuthError::Helper {
        helper: helper.to_string(),
        host: host.to_string(),
        message,
    };

    let mut child = Command::new(&helper_cmd)
        .arg("get")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| helper_error(format!("Failed to run {}: {}", helper_cmd, e)))?;

    // レジストリ名を stdin に渡す
    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(host.as_bytes())
            .map_err(|e| helper_error(format!("Failed to write to stdin: {}", e)))?;
    }

    let output = child
        .wait_with_output()
        .map_err(|e| helper_error(e.to_string()))?;

    if !output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stdout.contains(HELPER_NOT_FOUND) || stderr.contains(HELPER_NOT_FOUND) {
            tracing::debug!("Credential helper {} has no entry for {}", helper, host);
            return Ok(None);
        }
        return Err(helper_error(stderr.trim().to_string()));
    }

    let response: HelperResponse = serde_json::from_slice(&output.stdout)
        .map_err(|e| helper_error(format!("Failed to parse helper response: {}", e)))?;

    if response.username == TOKEN_USERNAME {
        return Ok(Some(StoredCredential::IdentityToken(response.secret)));
    }

    Ok(Some(StoredCredential::Basic {
        username: response.username,
        password: response.secret,
    }))
}
