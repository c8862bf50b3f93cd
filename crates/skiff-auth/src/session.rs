//! ビルドセッション
//!
//! ビルドデーモンからの認証リクエストを、接続されたハンドラに振り分けます。

use crate::error::{AuthError, Result};
use crate::provider::{AuthHandler, CredentialsRequest, CredentialsResponse};
use std::sync::Arc;

/// 認証ハンドラを保持するビルドセッション
#[derive(Clone, Default)]
pub struct BuildSession {
    auth: Option<Arc<dyn AuthHandler>>,
}

impl BuildSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// 認証ハンドラを接続（既存のハンドラは置き換える）
    pub fn attach(&mut self, handler: Arc<dyn AuthHandler>) -> &mut Self {
        self.auth = Some(handler);
        self
    }

    /// ハンドラが接続済みか
    pub fn has_auth(&self) -> bool {
        self.auth.is_some()
    }

    /// ホストの認証情報を問い合わせ
    ///
    /// ハンドラ未接続の場合は NotFound（匿名アクセス）として扱う。
    pub fn credentials(&self, host: &str) -> Result<CredentialsResponse> {
        let request = CredentialsRequest::new(host);
        match &self.auth {
            Some(handler) => handler.credentials(&request),
            None => Err(AuthError::NotFound {
                host: request.host,
            }),
        }
    }
}

impl std::fmt::Debug for BuildSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildSession")
            .field("auth", &self.auth.is_some())
            .finish()
    }
}
