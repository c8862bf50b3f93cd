use skiff_auth::AuthError;
use skiff_config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Dockerfile not found: {0}")]
    DockerfileNotFound(PathBuf),

    #[error("Build context directory not found: {0}")]
    ContextNotFound(PathBuf),

    #[error("Build host is not set")]
    NoBuildHost,

    #[error("Token for home registry {registry} is not available")]
    MissingToken { registry: String },

    #[error("Docker connection error: {0}")]
    DockerConnection(#[from] bollard::errors::Error),

    #[error("Build failed: {0}")]
    BuildFailed(String),

    #[error("Push failed: {message}")]
    PushFailed { message: String },

    #[error("Invalid tag: {tag}")]
    InvalidTag { tag: String },

    #[error("Invalid build configuration: {0}")]
    InvalidConfig(String),

    #[error("Registry authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// ユーザー向けの分かりやすいエラーメッセージ
    pub fn user_message(&self) -> String {
        match self {
            BuildError::DockerfileNotFound(path) => {
                format!(
                    "Dockerfileが見つかりません: {}\n\
                     \n\
                     解決方法:\n\
                     1. Dockerfileのパスを確認してください\n\
                     2. -f オプションで明示的にパスを指定してください:\n\
                        skiff build . -f path/to/Dockerfile",
                    path.display()
                )
            }
            BuildError::ContextNotFound(path) => {
                format!(
                    "ビルドコンテキストが見つかりません: {}\n\
                     \n\
                     skiff build の PATH 引数を確認してください。",
                    path.display()
                )
            }
            BuildError::NoBuildHost => "ビルドホストが設定されていません。\n\
                 \n\
                 解決方法:\n\
                 1. skiff login を実行してください\n\
                 2. または SKIFF_BUILD_HOST 環境変数でビルドデーモンを指定してください"
                .to_string(),
            BuildError::MissingToken { registry } => {
                format!(
                    "{} のトークンを読み込めませんでした。skiff login を実行しましたか？",
                    registry
                )
            }
            BuildError::BuildFailed(msg) => {
                format!(
                    "ビルドに失敗しました: {}\n\
                     \n\
                     Dockerfileの内容を確認してください。",
                    msg
                )
            }
            _ => format!("{}", self),
        }
    }
}

pub type BuildResult<T> = std::result::Result<T, BuildError>;
