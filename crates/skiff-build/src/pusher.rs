//! イメージプッシュ処理
//!
//! ビルドしたイメージをコンテナレジストリにプッシュします。

use crate::error::{BuildError, BuildResult};
use bollard::Docker;
use bollard::auth::DockerCredentials;
use bollard::models::PushImageInfo;
use colored::Colorize;
use futures_util::StreamExt;
use std::io::Write;

/// イメージプッシュを実行するハンドラ
pub struct ImagePusher {
    docker: Docker,
}

impl ImagePusher {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// イメージをレジストリにプッシュ
    ///
    /// # Arguments
    /// * `image` - イメージ名（レジストリ込み、タグなし）
    /// * `tag` - イメージタグ
    /// * `credentials` - セッションから解決した認証情報（匿名なら None）
    ///
    /// # Returns
    /// プッシュ成功時は完全なイメージ名を返す
    pub async fn push(
        &self,
        image: &str,
        tag: &str,
        credentials: Option<DockerCredentials>,
    ) -> BuildResult<String> {
        let full_image = format!("{}:{}", image, tag);

        validate_tag(tag)?;

        #[allow(deprecated)]
        let options = bollard::image::PushImageOptions::<String> {
            tag: tag.to_string(),
        };

        println!("  → {}", full_image.cyan());

        #[allow(deprecated)]
        let mut stream = self.docker.push_image(image, Some(options), credentials);

        let mut last_status = String::new();
        let mut error_message: Option<String> = None;

        while let Some(result) = stream.next().await {
            match result {
                Ok(info) => {
                    if let Some(err) = info.error {
                        error_message = Some(err);
                    } else {
                        handle_progress(&info, &mut last_status);
                    }
                }
                Err(e) => {
                    return Err(BuildError::PushFailed {
                        message: e.to_string(),
                    });
                }
            }
        }

        println!();

        if let Some(err) = error_message {
            return Err(BuildError::PushFailed { message: err });
        }

        Ok(full_image)
    }

    /// プッシュ済みイメージのダイジェストを取得
    pub async fn digest(&self, image: &str, tag: &str) -> BuildResult<Option<String>> {
        let inspect = self
            .docker
            .inspect_image(&format!("{}:{}", image, tag))
            .await?;

        Ok(inspect
            .repo_digests
            .unwrap_or_default()
            .iter()
            .find_map(|d| digest_for(d, image)))
    }
}

/// `repo@sha256:...` からイメージに対応するダイジェストを取り出す
fn digest_for(repo_digest: &str, image: &str) -> Option<String> {
    let (repo, digest) = repo_digest.split_once('@')?;
    (repo == image).then(|| digest.to_string())
}

/// タグのバリデーション
///
/// Docker タグの制約:
/// - 128文字以下
/// - 英数字、ピリオド、ハイフン、アンダースコアのみ
/// - 先頭はピリオドまたはハイフンではない
fn validate_tag(tag: &str) -> BuildResult<()> {
    if tag.is_empty() {
        return Err(BuildError::InvalidTag {
            tag: "(empty)".to_string(),
        });
    }

    if tag.len() > 128 {
        return Err(BuildError::InvalidTag {
            tag: format!("Tag too long ({} characters, max 128)", tag.len()),
        });
    }

    if tag.starts_with('.') || tag.starts_with('-') {
        return Err(BuildError::InvalidTag {
            tag: tag.to_string(),
        });
    }

    if let Some(c) = tag
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '.' && *c != '-' && *c != '_')
    {
        return Err(BuildError::InvalidTag {
            tag: format!("Invalid character '{}' in tag: {}", c, tag),
        });
    }

    Ok(())
}

/// プッシュ進捗を表示
fn handle_progress(info: &PushImageInfo, last_status: &mut String) {
    if let Some(status) = &info.status {
        let progress = info.progress.as_deref().unwrap_or("");

        match status.as_str() {
            "Pushing" => {
                print!("\r  ↑ {} {}     ", status, progress);
                std::io::stdout().flush().ok();
            }
            "Pushed" => {
                println!("\r  {} Pushed                    ", "✓".green());
            }
            "Layer already exists" => {
                println!("\r  {} Layer already exists      ", "✓".green());
            }
            "Preparing" | "Waiting" => {
                // 準備中は表示をスキップ（ノイズ軽減）
            }
            _ => {
                if status != last_status {
                    println!("\r  ℹ {}                    ", status);
                    *last_status = status.clone();
                }
            }
        }
    }
}

/// イメージ名とタグを分離
///
/// # Examples
/// - `ghcr.io/org/app:v1.0` -> `("ghcr.io/org/app", "v1.0")`
/// - `ghcr.io/org/app` -> `("ghcr.io/org/app", "latest")`
/// - `localhost:5000/app:dev` -> `("localhost:5000/app", "dev")`
pub fn split_image_tag(image: &str) -> (String, String) {
    if let Some(pos) = image.rfind(':') {
        let potential_tag = &image[pos + 1..];
        let potential_image = &image[..pos];

        // ポート番号は / を含まない純粋な数字
        if !potential_tag.contains('/') && !potential_tag.chars().all(|c| c.is_ascii_digit()) {
            return (potential_image.to_string(), potential_tag.to_string());
        }
    }

    (image.to_string(), "latest".to_string())
}
