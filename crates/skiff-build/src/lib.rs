//! skiff のイメージビルド
//!
//! ビルドデーモンへの接続、ビルドオプションの組み立て、認証プロバイダの選択、
//! ビルドと進捗表示の並行実行、レジストリへのプッシュを提供します。

pub mod auth;
pub mod builder;
pub mod context;
pub mod error;
pub mod host;
pub mod hosts;
pub mod options;
pub mod progress;
pub mod pusher;

pub use auth::{resolve_registry_credentials, select_auth_handler, to_docker_credentials};
pub use builder::{BuildOutcome, ImageBuilder};
pub use context::ContextBuilder;
pub use error::{BuildError, BuildResult};
pub use host::{connect, resolve_build_host};
pub use hosts::{credential_hosts, registry_host};
pub use options::BuildOptions;
pub use progress::BuildProgress;
pub use pusher::{ImagePusher, split_image_tag};
