//! ビルドが参照するレジストリホストの抽出

use std::collections::HashSet;

/// Docker Hub のイメージに対してデーモンが提示するホスト名
pub const DOCKER_HUB_HOST: &str = "registry-1.docker.io";

/// イメージ名からレジストリのホストを抽出
///
/// # Examples
/// - `ghcr.io/org/app:tag` -> `ghcr.io`
/// - `myuser/app:tag` -> `registry-1.docker.io`
/// - `localhost:5000/app` -> `localhost:5000`
/// - `localhost/app` -> `localhost`
pub fn registry_host(image: &str) -> &str {
    if let Some((first, _)) = image.split_once('/') {
        // `.` や `:` を含む、または localhost ならレジストリ
        if first.contains('.') || first.contains(':') || first == "localhost" {
            return first;
        }
    }

    DOCKER_HUB_HOST
}

/// ビルドで認証が必要になりうるホストの一覧
///
/// Dockerfile の `FROM` で参照するイメージと、プッシュ先のタグのホストを重複なしで返す。
/// `scratch`、ステージ名、ARG を含む参照は対象外。
pub fn credential_hosts(dockerfile: &str, tag: Option<&str>) -> Vec<String> {
    let mut stages = HashSet::new();
    let mut hosts = Vec::new();
    let mut push_host = |host: &str| {
        if !hosts.iter().any(|h| h == host) {
            hosts.push(host.to_string());
        }
    };

    for line in dockerfile.lines() {
        let mut words = line.split_whitespace();
        let Some(instruction) = words.next() else {
            continue;
        };
        if !instruction.eq_ignore_ascii_case("FROM") {
            continue;
        }

        // --platform=... などのフラグを読み飛ばす
        let mut words = words.skip_while(|w| w.starts_with("--"));
        let Some(image) = words.next() else {
            continue;
        };

        if let (Some(as_kw), Some(stage)) = (words.next(), words.next())
            && as_kw.eq_ignore_ascii_case("AS")
        {
            stages.insert(stage.to_ascii_lowercase());
        }

        if image.eq_ignore_ascii_case("scratch") || stages.contains(&image.to_ascii_lowercase()) {
            continue;
        }

        if image.contains('$') {
            tracing::debug!("Skipping FROM with build arg: {}", image);
            continue;
        }

        push_host(registry_host(image));
    }

    if let Some(tag) = tag {
        push_host(registry_host(tag));
    }

    hosts
}
