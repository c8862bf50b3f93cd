//! skiff login コマンドハンドラ

use colored::Colorize;
use skiff_config::Context;

pub struct LoginArgs {
    pub url: String,
    pub token: String,
    pub user: Option<String>,
    pub username: Option<String>,
    pub registry: Option<String>,
    pub build_host: Option<String>,
}

/// 引数からログイン情報を組み立てる
///
/// `--user` を省略した場合は `--username` をユーザーIDとして使う
pub fn build_context(args: LoginArgs) -> anyhow::Result<Context> {
    if args.token.trim().is_empty() {
        anyhow::bail!("トークンが空です。--token または SKIFF_TOKEN を指定してください");
    }

    let user_id = args
        .user
        .or_else(|| args.username.clone())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| anyhow::anyhow!("--user または --username を指定してください"))?;

    let mut context = Context::new(&args.url, args.token.trim(), &user_id)?;
    context.username = args.username;
    context.registry = args.registry.filter(|r| !r.is_empty());
    context.build_host = args.build_host.filter(|h| !h.is_empty());
    Ok(context)
}

pub fn handle(args: LoginArgs) -> anyhow::Result<()> {
    let context = build_context(args)?;
    let path = skiff_config::save_context(&context)?;

    println!("{} {}", "✓ ログインしました:".green().bold(), context.url.cyan());
    println!("  ユーザー: {}", context.user_id);
    println!("  レジストリ: {}", context.registry()?);
    println!("  ビルドホスト: {}", context.build_host()?);
    println!("  保存先: {}", path.display().to_string().dimmed());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> LoginArgs {
        LoginArgs {
            url: "https://cloud.example.com/".to_string(),
            token: "tok123".to_string(),
            user: Some("homeuser".to_string()),
            username: None,
            registry: None,
            build_host: None,
        }
    }

    #[test]
    fn test_build_context_defaults() {
        let context = build_context(args()).unwrap();
        assert_eq!(context.url, "https://cloud.example.com");
        assert_eq!(context.user_id, "homeuser");
        assert_eq!(context.registry().unwrap(), "registry.cloud.example.com");
    }

    #[test]
    fn test_username_used_as_user_id() {
        let context = build_context(LoginArgs {
            user: None,
            username: Some("alice".to_string()),
            ..args()
        })
        .unwrap();
        assert_eq!(context.user_id, "alice");
        assert_eq!(context.username.as_deref(), Some("alice"));
    }

    #[test]
    fn test_missing_user_is_error() {
        assert!(build_context(LoginArgs { user: None, ..args() }).is_err());
    }

    #[test]
    fn test_empty_token_is_error() {
        assert!(
            build_context(LoginArgs {
                token: "  ".to_string(),
                ..args()
            })
            .is_err()
        );
    }

    #[test]
    fn test_overrides_are_kept() {
        let context = build_context(LoginArgs {
            registry: Some("registry.internal".to_string()),
            build_host: Some("unix:///run/buildkit.sock".to_string()),
            ..args()
        })
        .unwrap();
        assert_eq!(context.registry().unwrap(), "registry.internal");
        assert_eq!(context.build_host().unwrap(), "unix:///run/buildkit.sock");
    }
}
