use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// 認証情報ストア（config.json）の読み込み・解析に失敗
    #[error("Failed to load credential store {path}: {message}")]
    Load { path: PathBuf, message: String },

    /// 指定ホストの認証情報が存在しない
    #[error("No credentials found for {host}")]
    NotFound { host: String },

    /// credential helper の実行に失敗
    #[error("Credential helper docker-credential-{helper} failed for {host}: {message}")]
    Helper {
        helper: String,
        host: String,
        message: String,
    },
}

impl AuthError {
    /// 認証情報が見つからなかっただけのエラーか
    pub fn is_not_found(&self) -> bool {
        matches!(self, AuthError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
