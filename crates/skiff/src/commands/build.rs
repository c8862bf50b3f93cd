//! skiff build コマンドハンドラ

use colored::Colorize;
use skiff_auth::{BuildSession, CredentialStore};
use skiff_build::{
    BuildError, BuildOptions, BuildOutcome, BuildProgress, ImageBuilder, connect,
    resolve_build_host, select_auth_handler,
};
use std::path::Path;

pub async fn handle(
    path: &Path,
    file: Option<&Path>,
    tag: Option<&str>,
    target: Option<&str>,
    no_cache: bool,
) -> anyhow::Result<()> {
    match run(path, file, tag, target, no_cache).await {
        Ok(outcome) => {
            print_outcome(&outcome);
            Ok(())
        }
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ ビルドに失敗しました".red().bold());
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
    }
}

async fn run(
    path: &Path,
    file: Option<&Path>,
    tag: Option<&str>,
    target: Option<&str>,
    no_cache: bool,
) -> Result<BuildOutcome, BuildError> {
    // 未ログインでもローカルの認証情報でビルドできる
    let context = match skiff_config::load_context() {
        Ok(context) => Some(context),
        Err(e) => {
            tracing::debug!("No stored context: {}", e);
            None
        }
    };

    let options = BuildOptions::new(path, file, tag, target, no_cache)?;
    if !options.push() {
        println!(
            "{}",
            "タグが指定されていないため、イメージはプッシュされません。".yellow()
        );
    }

    let build_host = resolve_build_host(context.as_ref())?;
    println!("{} {}", "ビルドホスト:".bold(), build_host.cyan());
    let docker = connect(&build_host)?;

    let handler = select_auth_handler(
        options.tag.as_deref(),
        context.as_ref(),
        &CredentialStore::default_path(),
    )?;
    let mut session = BuildSession::new();
    session.attach(handler);

    let label = options
        .tag
        .clone()
        .unwrap_or_else(|| options.context.display().to_string());
    let progress = BuildProgress::new(&label);

    ImageBuilder::new(docker)
        .run(&options, &session, progress)
        .await
}

fn print_outcome(outcome: &BuildOutcome) {
    println!();
    match &outcome.image {
        Some(image) => {
            println!("{} {}", "✓ プッシュしました:".green().bold(), image.cyan());
            if let Some(digest) = &outcome.digest {
                println!("  digest: {}", digest);
            }
        }
        None => println!("{}", "✓ ビルドが完了しました".green().bold()),
    }
}
