//! ビルドセッションに認証情報を返すプロバイダ
//!
//! - [`LocalAuthProvider`]: ローカルの config.json のみを参照
//! - [`AuthRelay`]: ホームレジストリの認証情報を最優先し、それ以外は config.json を参照

use crate::error::Result;
use crate::store::{CredentialStore, StoredCredential};
use std::fmt;
use std::path::Path;
use std::sync::Mutex;

/// ビルドデーモンが提示するホスト名 -> config.json 上のキー
///
/// Docker Hub はデーモン側とローカルストア側でホスト名が異なる。
pub const HOST_ALIASES: &[(&str, &str)] = &[("registry-1.docker.io", "https://index.docker.io/v1/")];

/// ストア検索を直列化するプロセス全体のロック
static STORE_LOOKUP: Mutex<()> = Mutex::new(());

/// ホスト名をローカルストアのキーに正規化
pub fn canonical_host(host: &str) -> &str {
    HOST_ALIASES
        .iter()
        .find(|(alias, _)| *alias == host)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(host)
}

/// 認証情報のリクエスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialsRequest {
    pub host: String,
}

impl CredentialsRequest {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }
}

/// 認証情報のレスポンス
///
/// identity token の場合は `username` が空になる。
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialsResponse {
    pub username: String,
    pub secret: String,
}

impl CredentialsResponse {
    /// identity token のみのレスポンスか
    pub fn is_identity_token(&self) -> bool {
        self.username.is_empty()
    }
}

impl fmt::Debug for CredentialsResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsResponse")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl From<StoredCredential> for CredentialsResponse {
    fn from(credential: StoredCredential) -> Self {
        match credential {
            StoredCredential::IdentityToken(token) => Self {
                username: String::new(),
                secret: token,
            },
            StoredCredential::Basic { username, password } => Self {
                username,
                secret: password,
            },
        }
    }
}

/// ビルドセッションの認証チャネルに接続するハンドラ
///
/// 複数のリクエストが並行して届くことがある。
pub trait AuthHandler: Send + Sync {
    fn credentials(&self, request: &CredentialsRequest) -> Result<CredentialsResponse>;
}

/// ローカルの認証情報のみを返すプロバイダ
#[derive(Debug)]
pub struct LocalAuthProvider {
    store: CredentialStore,
}

impl LocalAuthProvider {
    pub fn new(store: CredentialStore) -> Self {
        Self { store }
    }

    /// config.json を読み込んで作成
    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::new(CredentialStore::load(path)?))
    }

    /// ホストの認証情報を解決
    pub fn resolve_credentials(&self, host: &str) -> Result<CredentialsResponse> {
        let key = canonical_host(host);
        if key != host {
            tracing::debug!("Rewriting registry host {} -> {}", host, key);
        }

        // docker-credential-osxkeychain は並行呼び出しでハングする (docker/cli#1862)
        let credential = {
            let _guard = STORE_LOOKUP
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            self.store.get(key)
        }?;

        Ok(credential.into())
    }
}

impl AuthHandler for LocalAuthProvider {
    fn credentials(&self, request: &CredentialsRequest) -> Result<CredentialsResponse> {
        self.resolve_credentials(&request.host)
    }
}

/// ホームレジストリのログイン情報
#[derive(Clone, PartialEq, Eq)]
pub struct HomeIdentity {
    /// ホームレジストリのホスト（例: "registry.cloud.example.com"）
    pub registry: String,
    pub username: String,
    /// セッショントークン
    pub secret: String,
}

impl HomeIdentity {
    pub fn new(
        registry: impl Into<String>,
        username: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            registry: registry.into(),
            username: username.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for HomeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HomeIdentity")
            .field("registry", &self.registry)
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// ホームレジストリの認証情報を注入するプロバイダ
///
/// 解決順序:
/// 1. ホームレジストリ: ログイン情報をそのまま返す（ストアは参照しない）
/// 2. それ以外: [`LocalAuthProvider`] に委譲
///
/// ログイン情報はストアに書き込まないため、config.json に保存されることはない。
#[derive(Debug)]
pub struct AuthRelay {
    home: HomeIdentity,
    local: LocalAuthProvider,
}

impl AuthRelay {
    /// config.json を読み込み、ホームレジストリの認証情報を上書き登録して作成
    pub fn new(home: HomeIdentity, path: &Path) -> Result<Self> {
        Ok(Self {
            home,
            local: LocalAuthProvider::load(path)?,
        })
    }

    /// 読み込み済みのストアから作成
    pub fn with_store(home: HomeIdentity, store: CredentialStore) -> Self {
        Self {
            home,
            local: LocalAuthProvider::new(store),
        }
    }

    /// ホームレジストリのホスト
    pub fn home_registry(&self) -> &str {
        &self.home.registry
    }

    /// ホストの認証情報を解決
    pub fn resolve_credentials(&self, host: &str) -> Result<CredentialsResponse> {
        if host == self.home.registry {
            tracing::debug!("Using home registry credentials for {}", host);
            return Ok(CredentialsResponse {
                username: self.home.username.clone(),
                secret: self.home.secret.clone(),
            });
        }

        self.local.resolve_credentials(host)
    }
}

impl AuthHandler for AuthRelay {
    fn credentials(&self, request: &CredentialsRequest) -> Result<CredentialsResponse> {
        self.resolve_credentials(&request.host)
    }
}
