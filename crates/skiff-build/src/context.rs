use crate::error::{BuildError, BuildResult};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;
use std::path::Path;
use tar::Builder;

/// アーカイブ内の Dockerfile のパス
///
/// コンテキスト外の Dockerfile も扱えるよう、専用の名前でルートに格納する。
/// コンテキスト内の同名ファイルはアーカイブに含めない。
pub const DOCKERFILE_ENTRY: &str = ".skiff.Dockerfile";

/// コンテキストサイズの警告しきい値
const MAX_CONTEXT_SIZE: usize = 500 * 1024 * 1024; // 500MB

pub struct ContextBuilder;

impl ContextBuilder {
    /// ビルドコンテキストをtar.gzアーカイブとして作成
    pub fn create_context(context_path: &Path, dockerfile_path: &Path) -> BuildResult<Vec<u8>> {
        tracing::debug!("Creating build context from: {}", context_path.display());

        let dockerfile_content = std::fs::read(dockerfile_path)
            .map_err(|_| BuildError::DockerfileNotFound(dockerfile_path.to_path_buf()))?;

        let mut archive_data = Vec::new();
        {
            let encoder = GzEncoder::new(&mut archive_data, Compression::default());
            let mut tar = Builder::new(encoder);

            append_context_dir(&mut tar, context_path, Path::new(""))?;

            let mut header = tar::Header::new_gnu();
            header.set_path(DOCKERFILE_ENTRY).map_err(|e| {
                BuildError::InvalidConfig(format!("Failed to set Dockerfile path: {}", e))
            })?;
            header.set_size(dockerfile_content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();

            tar.append(&header, &dockerfile_content[..])?;

            tar.into_inner()?.finish()?;
        }

        tracing::debug!("Build context created: {} bytes", archive_data.len());

        if archive_data.len() > MAX_CONTEXT_SIZE {
            tracing::warn!(
                "警告: ビルドコンテキストが大きすぎます（{}MB）\n\
                 .dockerignoreファイルで不要なファイルを除外することを推奨します。",
                archive_data.len() / 1024 / 1024
            );
        }

        Ok(archive_data)
    }
}

/// コンテキストを再帰的に追加（予約済みの Dockerfile エントリは除く）
fn append_context_dir<W: Write>(
    tar: &mut Builder<W>,
    root: &Path,
    relative: &Path,
) -> BuildResult<()> {
    let mut entries = std::fs::read_dir(root.join(relative))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let name = relative.join(entry.file_name());
        if name == Path::new(DOCKERFILE_ENTRY) {
            tracing::warn!(
                "Skipping {} in build context (reserved for the selected Dockerfile)",
                DOCKERFILE_ENTRY
            );
            continue;
        }

        let path = entry.path();
        if path.is_dir() {
            tar.append_dir(&name, &path)?;
            append_context_dir(tar, root, &name)?;
        } else {
            tar.append_path_with_name(&path, &name)?;
        }
    }

    Ok(())
}
