//! ビルドセッションへの認証プロバイダの接続
//!
//! プッシュ先がホームレジストリなら [`AuthRelay`]、それ以外は [`LocalAuthProvider`] を使い、
//! 解決した認証情報を Bollard の DockerCredentials に変換します。

use crate::error::{BuildError, BuildResult};
use bollard::auth::DockerCredentials;
use futures_util::future::try_join_all;
use skiff_auth::{
    AuthHandler, AuthRelay, BuildSession, CredentialsResponse, HomeIdentity, LocalAuthProvider,
    canonical_host,
};
use skiff_config::Context;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// タグに応じた認証プロバイダを選択
///
/// タグがホームレジストリで始まる場合はログイン情報を注入する。
/// ログインしていない場合はローカルの認証情報のみを使う。
pub fn select_auth_handler(
    tag: Option<&str>,
    context: Option<&Context>,
    store_path: &Path,
) -> BuildResult<Arc<dyn AuthHandler>> {
    if let (Some(tag), Some(context)) = (tag, context) {
        let registry = context.registry()?;
        if tag.starts_with(&registry) {
            if context.token.is_empty() {
                return Err(BuildError::MissingToken { registry });
            }

            tracing::debug!("Attaching home registry credentials for {}", registry);
            let home = HomeIdentity::new(registry, &context.user_id, &context.token);
            return Ok(Arc::new(AuthRelay::new(home, store_path)?));
        }
    }

    tracing::debug!("Attaching local credentials from {}", store_path.display());
    Ok(Arc::new(LocalAuthProvider::load(store_path)?))
}

/// 認証情報を DockerCredentials に変換
pub fn to_docker_credentials(host: &str, response: CredentialsResponse) -> DockerCredentials {
    if response.is_identity_token() {
        return DockerCredentials {
            identitytoken: Some(response.secret),
            serveraddress: Some(host.to_string()),
            ..Default::default()
        };
    }

    DockerCredentials {
        username: Some(response.username),
        password: Some(response.secret),
        serveraddress: Some(host.to_string()),
        ..Default::default()
    }
}

/// 1ホスト分の認証情報を問い合わせ
///
/// 見つからない場合は `None`（匿名アクセス）
pub async fn resolve_host(
    session: &BuildSession,
    host: &str,
) -> BuildResult<Option<DockerCredentials>> {
    let session = session.clone();
    let host = host.to_string();

    // 解決処理はブロッキング（credential helper のサブプロセス）
    tokio::task::spawn_blocking(move || match session.credentials(&host) {
        Ok(response) => Ok(Some(to_docker_credentials(&host, response))),
        Err(e) if e.is_not_found() => {
            tracing::debug!("No credentials for {}, continuing anonymously", host);
            Ok(None)
        }
        Err(e) => Err(BuildError::Auth(e)),
    })
    .await?
}

/// 複数ホストの認証情報を並行して問い合わせ
///
/// 戻り値のキーはデーモン側のレジストリ設定のキー（Docker Hub は index サーバー）
pub async fn resolve_registry_credentials(
    session: &BuildSession,
    hosts: &[String],
) -> BuildResult<HashMap<String, DockerCredentials>> {
    let lookups = hosts.iter().map(|host| async move {
        let credentials = resolve_host(session, host).await?;
        Ok::<_, BuildError>(credentials.map(|c| (canonical_host(host).to_string(), c)))
    });

    let resolved = try_join_all(lookups).await?;
    Ok(resolved.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const STORE_JSON: &str = r#"{
        "auths": {
            "india:5000": {"username": "u", "password": "p"},
            "https://index.docker.io/v1/": {"username": "hubuser", "password": "hubpass"},
            "acr.example.io": {"identitytoken": "refresh-token"}
        }
    }"#;

    fn context() -> Context {
        let mut context = Context::new("https://cloud.example.com", "tok123", "homeuser").unwrap();
        context.registry = Some("registry.home".to_string());
        context
    }

    fn session_for(tag: Option<&str>, context: Option<&Context>) -> BuildSession {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, STORE_JSON).unwrap();

        let handler = select_auth_handler(tag, context, &path).unwrap();
        let mut session = BuildSession::new();
        session.attach(handler);
        session
    }

    #[test]
    fn test_home_registry_tag_attaches_relay() {
        let context = context();
        let session = session_for(Some("registry.home/team/app:dev"), Some(&context));

        let response = session.credentials("registry.home").unwrap();
        assert_eq!(response.username, "homeuser");
        assert_eq!(response.secret, "tok123");
    }

    #[test]
    fn test_other_tag_attaches_local_provider() {
        let context = context();
        let session = session_for(Some("ghcr.io/org/app:v1"), Some(&context));

        assert!(session.credentials("registry.home").unwrap_err().is_not_found());
        assert_eq!(session.credentials("india:5000").unwrap().username, "u");
    }

    #[test]
    fn test_no_context_uses_local_provider() {
        let session = session_for(Some("registry.home/team/app"), None);
        assert!(session.credentials("registry.home").unwrap_err().is_not_found());
    }

    #[test]
    fn test_empty_token_is_rejected() {
        let mut context = context();
        context.token = String::new();

        let temp_dir = tempdir().unwrap();
        let result = select_auth_handler(
            Some("registry.home/team/app"),
            Some(&context),
            &temp_dir.path().join("config.json"),
        );
        assert!(matches!(result, Err(BuildError::MissingToken { .. })));
    }

    #[test]
    fn test_load_error_is_propagated() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let result = select_auth_handler(None, None, &path);
        assert!(matches!(result, Err(BuildError::Auth(ref e)) if !e.is_not_found()));
    }

    #[test]
    fn test_to_docker_credentials_identity_token() {
        let credentials = to_docker_credentials(
            "acr.example.io",
            CredentialsResponse {
                username: String::new(),
                secret: "refresh-token".to_string(),
            },
        );
        assert_eq!(credentials.identitytoken.as_deref(), Some("refresh-token"));
        assert!(credentials.username.is_none());
        assert!(credentials.password.is_none());
    }

    #[tokio::test]
    async fn test_resolve_registry_credentials() {
        let context = context();
        let session = session_for(Some("registry.home/team/app"), Some(&context));

        let hosts = vec![
            "registry-1.docker.io".to_string(),
            "india:5000".to_string(),
            "acr.example.io".to_string(),
            "registry.home".to_string(),
            "unknown:5000".to_string(),
        ];
        let credentials = resolve_registry_credentials(&session, &hosts).await.unwrap();

        assert_eq!(credentials.len(), 4);
        assert_eq!(
            credentials["https://index.docker.io/v1/"].username.as_deref(),
            Some("hubuser")
        );
        assert_eq!(credentials["india:5000"].password.as_deref(), Some("p"));
        assert_eq!(
            credentials["acr.example.io"].identitytoken.as_deref(),
            Some("refresh-token")
        );
        assert_eq!(credentials["registry.home"].password.as_deref(), Some("tok123"));
        assert!(!credentials.contains_key("unknown:5000"));
    }

    #[tokio::test]
    async fn test_resolve_host_without_handler() {
        let session = BuildSession::new();
        assert!(resolve_host(&session, "india:5000").await.unwrap().is_none());
    }
}
