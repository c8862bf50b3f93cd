use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("ホームディレクトリが見つかりません")]
    HomeDirNotFound,

    #[error(
        "ログイン情報が見つかりません: {0}\n\
        `skiff login --url <API URL> --token <TOKEN>` を実行してください"
    )]
    NotLoggedIn(PathBuf),

    #[error("ログイン情報の読み込みに失敗しました ({path}): {source}")]
    InvalidContext {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("API URL が不正です: {0}")]
    InvalidUrl(String),

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON エラー: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
