//! skiff namespace コマンドハンドラ

use colored::Colorize;
use skiff_cloud::{CloudClient, validate_namespace_name};

fn client() -> anyhow::Result<CloudClient> {
    let context = skiff_config::load_context()?;
    Ok(CloudClient::new(&context.url, &context.token))
}

/// skiff namespace create
pub async fn handle_create(name: &str) -> anyhow::Result<()> {
    validate_namespace_name(name)?;
    let client = client()?;

    println!("{} {}", "ネームスペースを作成中:".blue(), name.cyan());
    let id = client.create_namespace(name).await?;
    tracing::debug!("Created namespace id: {}", id);

    println!("{} {}", "✓ 作成しました:".green().bold(), name.cyan());
    Ok(())
}

/// skiff namespace delete
pub async fn handle_delete(name: &str) -> anyhow::Result<()> {
    validate_namespace_name(name)?;
    let client = client()?;

    println!("{} {}", "ネームスペースを削除中:".blue(), name.cyan());
    client.delete_namespace(name).await?;

    println!("{} {}", "✓ 削除しました:".green().bold(), name.cyan());
    Ok(())
}
