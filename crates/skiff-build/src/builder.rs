use crate::auth::{resolve_host, resolve_registry_credentials};
use crate::context::{ContextBuilder, DOCKERFILE_ENTRY};
use crate::error::{BuildError, BuildResult};
use crate::hosts::{credential_hosts, registry_host};
use crate::options::BuildOptions;
use crate::progress::BuildProgress;
use crate::pusher::{ImagePusher, split_image_tag};
use bollard::Docker;
use bollard::auth::DockerCredentials;
use bollard::models::BuildInfo;
use futures_util::stream::StreamExt;
use skiff_auth::BuildSession;
use std::collections::HashMap;
use tokio::sync::mpsc;

/// 進捗チャネルのバッファ
const PROGRESS_BUFFER: usize = 64;

/// ビルド結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOutcome {
    /// プッシュしたイメージ（`image:tag`）
    pub image: Option<String>,
    /// レジストリ上のダイジェスト
    pub digest: Option<String>,
}

pub struct ImageBuilder {
    docker: Docker,
}

impl ImageBuilder {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// イメージをビルドし、タグがあればプッシュする
    ///
    /// ビルドストリームの受信と進捗表示を並行して実行する。
    pub async fn run(
        &self,
        options: &BuildOptions,
        session: &BuildSession,
        progress: BuildProgress,
    ) -> BuildResult<BuildOutcome> {
        let dockerfile = std::fs::read_to_string(&options.dockerfile)
            .map_err(|_| BuildError::DockerfileNotFound(options.dockerfile.clone()))?;

        // 必要なレジストリの認証情報をセッションから取得
        let hosts = credential_hosts(&dockerfile, options.tag.as_deref());
        tracing::debug!("Registry hosts for build: {:?}", hosts);
        let credentials = resolve_registry_credentials(session, &hosts).await?;

        let context_data = ContextBuilder::create_context(&options.context, &options.dockerfile)?;

        let (tx, rx) = mpsc::channel(PROGRESS_BUFFER);
        tokio::try_join!(
            self.build_image(context_data, options, credentials, tx),
            progress.display(rx),
        )?;

        let Some(tag) = options.tag.as_deref() else {
            return Ok(BuildOutcome::default());
        };

        let (image, image_tag) = split_image_tag(tag);
        let push_credentials = resolve_host(session, registry_host(&image)).await?;

        let pusher = ImagePusher::new(self.docker.clone());
        let pushed = pusher.push(&image, &image_tag, push_credentials).await?;
        let digest = pusher.digest(&image, &image_tag).await?;

        tracing::info!("Successfully pushed: {}", pushed);
        Ok(BuildOutcome {
            image: Some(pushed),
            digest,
        })
    }

    /// ビルドを開始し、出力をチャネルに流す
    async fn build_image(
        &self,
        context_data: Vec<u8>,
        options: &BuildOptions,
        credentials: HashMap<String, DockerCredentials>,
        tx: mpsc::Sender<BuildInfo>,
    ) -> BuildResult<()> {
        let tag = options.tag.as_deref().unwrap_or("");
        tracing::info!("Building image: {}", if tag.is_empty() { "(untagged)" } else { tag });

        let build_args = options.build_args();
        let build_args_refs: HashMap<&str, &str> = build_args
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let cache_from = options.cache_from();

        #[allow(deprecated)]
        let build_options = bollard::image::BuildImageOptions {
            dockerfile: DOCKERFILE_ENTRY,
            t: tag,
            buildargs: build_args_refs,
            target: options.target.as_deref().unwrap_or(""),
            nocache: options.no_cache,
            cachefrom: cache_from.iter().map(String::as_str).collect(),
            rm: true,      // 中間コンテナを削除
            forcerm: true, // ビルド失敗時も中間コンテナを削除
            ..Default::default()
        };

        tracing::debug!("Build options: {:?}", build_options);

        use bytes::Bytes;
        use http_body_util::{Either, Full};
        let body = Full::new(Bytes::from(context_data));
        let credentials = (!credentials.is_empty()).then_some(credentials);
        let mut stream = self
            .docker
            .build_image(build_options, credentials, Some(Either::Left(body)));

        while let Some(msg) = stream.next().await {
            let output = msg?;
            // 表示側が終了していたら（エラー時）ビルドの受信もやめる
            if tx.send(output).await.is_err() {
                break;
            }
        }

        Ok(())
    }
}
