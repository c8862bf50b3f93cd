use crate::error::{BuildError, BuildResult};
use bollard::models::BuildInfo;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

pub struct BuildProgress {
    progress_bar: ProgressBar,
}

impl BuildProgress {
    pub fn new(label: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) =
            ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
        {
            pb.set_style(style);
        }
        pb.set_message(format!("Building {}...", label));

        Self { progress_bar: pb }
    }

    /// 描画しない（テスト・非端末向け）
    pub fn hidden() -> Self {
        Self {
            progress_bar: ProgressBar::hidden(),
        }
    }

    pub fn set_message(&self, msg: &str) {
        self.progress_bar.set_message(msg.to_string());
    }

    /// スピナーを崩さずに1行出力
    pub fn println(&self, line: &str) {
        self.progress_bar.println(line);
    }

    pub fn finish_success(&self) {
        self.progress_bar.finish_with_message("Build completed ✓");
    }

    pub fn finish_error(&self, error: &str) {
        self.progress_bar
            .finish_with_message(format!("Build failed: {}", error));
    }

    /// ビルド出力を1件処理
    pub fn handle_build_output(&self, output: BuildInfo) -> BuildResult<()> {
        if let Some(stream) = output.stream {
            for line in stream.lines().filter(|l| !l.trim().is_empty()) {
                // "Step 2/5 : RUN ..." はスピナーにも表示
                if line.starts_with("Step ") {
                    self.set_message(line);
                }
                self.println(line);
            }
        }

        if let Some(error_detail) = output.error_detail {
            let error_msg = error_detail
                .message
                .unwrap_or_else(|| "Unknown build error".to_string());
            return Err(BuildError::BuildFailed(error_msg));
        }

        if let Some(error) = output.error {
            return Err(BuildError::BuildFailed(error));
        }

        if let Some(status) = output.status {
            // ステータスメッセージ（pull等）
            self.println(&status.cyan().to_string());
        }

        Ok(())
    }

    /// チャネルから届くビルド出力を表示し続ける
    ///
    /// 送信側が閉じたら終了。ビルドエラーを受け取った時点でエラーを返す。
    pub async fn display(self, mut rx: mpsc::Receiver<BuildInfo>) -> BuildResult<()> {
        while let Some(output) = rx.recv().await {
            if let Err(e) = self.handle_build_output(output) {
                self.finish_error(&e.to_string());
                return Err(e);
            }
        }

        self.finish_success();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::models::ErrorDetail;

    #[test]
    fn test_stream_output_is_ok() {
        let progress = BuildProgress::hidden();
        let output = BuildInfo {
            stream: Some("Step 1/2 : FROM alpine\n".to_string()),
            ..Default::default()
        };
        assert!(progress.handle_build_output(output).is_ok());
    }

    #[test]
    fn test_error_detail_fails_build() {
        let progress = BuildProgress::hidden();
        let output = BuildInfo {
            error_detail: Some(ErrorDetail {
                message: Some("RUN returned exit code 1".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let result = progress.handle_build_output(output);
        assert!(matches!(result, Err(BuildError::BuildFailed(ref msg)) if msg == "RUN returned exit code 1"));
    }

    #[tokio::test]
    async fn test_display_stops_on_error() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(BuildInfo {
            stream: Some("Step 1/1 : FROM alpine\n".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
        tx.send(BuildInfo {
            error: Some("pull access denied".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
        drop(tx);

        let result = BuildProgress::hidden().display(rx).await;
        assert!(matches!(result, Err(BuildError::BuildFailed(ref msg)) if msg == "pull access denied"));
    }

    #[tokio::test]
    async fn test_display_finishes_when_sender_closes() {
        let (tx, rx) = mpsc::channel(1);
        drop(tx);
        assert!(BuildProgress::hidden().display(rx).await.is_ok());
    }
}
