//! skiff のレジストリ認証
//!
//! ビルドデーモンからの認証リクエストに対して、ホームレジストリのログイン情報と
//! ローカルの Docker config.json を決められた優先順位で解決します。

pub mod error;
pub mod provider;
pub mod session;
pub mod store;

pub use error::{AuthError, Result};
pub use provider::{
    AuthHandler, AuthRelay, CredentialsRequest, CredentialsResponse, HOST_ALIASES, HomeIdentity,
    LocalAuthProvider, canonical_host,
};
pub use session::BuildSession;
pub use store::{CredentialStore, StoredCredential};
