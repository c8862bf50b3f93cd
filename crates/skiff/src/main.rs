mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "skiff")]
#[command(about = "リモートのビルドデーモンで、手元の認証情報のままビルドする。", long_about = None)]
struct Cli {
    /// デバッグログを出力
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// イメージをビルド（タグ指定時はプッシュ）
    Build {
        /// ビルドコンテキストのディレクトリ
        path: PathBuf,
        /// Dockerfileのパス（デフォルト: PATH/Dockerfile）
        #[arg(short = 'f', long = "file")]
        file: Option<PathBuf>,
        /// イメージタグ（指定するとビルド後にプッシュ）
        #[arg(short, long)]
        tag: Option<String>,
        /// ビルドするステージ
        #[arg(long)]
        target: Option<String>,
        /// キャッシュを使わない
        #[arg(long)]
        no_cache: bool,
    },
    /// ネームスペース管理
    #[command(subcommand)]
    Namespace(NamespaceCommands),
    /// ログイン情報を保存
    Login {
        /// APIのURL
        #[arg(long, env = "SKIFF_URL")]
        url: String,
        /// APIトークン
        #[arg(long, env = "SKIFF_TOKEN", hide_env_values = true)]
        token: String,
        /// ユーザーID（ホームレジストリのユーザー名）
        #[arg(long)]
        user: Option<String>,
        /// 表示名
        #[arg(long)]
        username: Option<String>,
        /// ホームレジストリ（デフォルト: registry.<APIホスト>）
        #[arg(long)]
        registry: Option<String>,
        /// ビルドデーモンのアドレス（デフォルト: tcp://buildkit.<APIホスト>:1234）
        #[arg(long)]
        build_host: Option<String>,
    },
    /// バージョン情報を表示
    Version,
}

#[derive(Subcommand)]
enum NamespaceCommands {
    /// ネームスペースを作成
    Create {
        /// ネームスペース名
        name: String,
    },
    /// ネームスペースを削除
    Delete {
        /// ネームスペース名
        name: String,
    },
}

fn init_tracing(debug: bool) {
    let default_level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.debug);

    match cli.command {
        Commands::Build {
            path,
            file,
            tag,
            target,
            no_cache,
        } => {
            commands::build::handle(
                &path,
                file.as_deref(),
                tag.as_deref(),
                target.as_deref(),
                no_cache,
            )
            .await?;
        }
        Commands::Namespace(namespace_cmd) => match namespace_cmd {
            NamespaceCommands::Create { name } => {
                commands::namespace::handle_create(&name).await?;
            }
            NamespaceCommands::Delete { name } => {
                commands::namespace::handle_delete(&name).await?;
            }
        },
        Commands::Login {
            url,
            token,
            user,
            username,
            registry,
            build_host,
        } => {
            commands::login::handle(commands::login::LoginArgs {
                url,
                token,
                user,
                username,
                registry,
                build_host,
            })?;
        }
        Commands::Version => {
            println!("skiff {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
