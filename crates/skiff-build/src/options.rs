use crate::error::{BuildError, BuildResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// インラインキャッシュを有効にするビルド引数
const INLINE_CACHE_ARG: &str = "BUILDKIT_INLINE_CACHE";

/// `skiff build` のビルドオプション
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// ビルドコンテキストのディレクトリ
    pub context: PathBuf,
    /// Dockerfile のパス
    pub dockerfile: PathBuf,
    /// イメージ名とタグ（指定時はビルド後にプッシュ）
    pub tag: Option<String>,
    /// ビルドするステージ
    pub target: Option<String>,
    pub no_cache: bool,
}

impl BuildOptions {
    /// ビルドオプションを解決
    ///
    /// Dockerfile を省略した場合は `<context>/Dockerfile`
    pub fn new(
        context: &Path,
        dockerfile: Option<&Path>,
        tag: Option<&str>,
        target: Option<&str>,
        no_cache: bool,
    ) -> BuildResult<Self> {
        if !context.exists() {
            return Err(BuildError::ContextNotFound(context.to_path_buf()));
        }

        if !context.is_dir() {
            return Err(BuildError::InvalidConfig(format!(
                "Build context is not a directory: {}",
                context.display()
            )));
        }

        let dockerfile = match dockerfile {
            Some(path) => path.to_path_buf(),
            None => context.join("Dockerfile"),
        };

        if !dockerfile.is_file() {
            return Err(BuildError::DockerfileNotFound(dockerfile));
        }

        Ok(Self {
            context: context.to_path_buf(),
            dockerfile,
            tag: tag.filter(|t| !t.is_empty()).map(str::to_string),
            target: target.filter(|t| !t.is_empty()).map(str::to_string),
            no_cache,
        })
    }

    /// ビルド後にプッシュするか
    pub fn push(&self) -> bool {
        self.tag.is_some()
    }

    /// キャッシュの取り込み元（プッシュ先と同じイメージ）
    pub fn cache_from(&self) -> Vec<String> {
        self.tag.iter().cloned().collect()
    }

    /// デーモンに渡すビルド引数
    ///
    /// プッシュする場合はインラインキャッシュを埋め込む
    pub fn build_args(&self) -> HashMap<String, String> {
        let mut args = HashMap::new();
        if self.push() {
            args.insert(INLINE_CACHE_ARG.to_string(), "1".to_string());
        }
        args
    }
}
