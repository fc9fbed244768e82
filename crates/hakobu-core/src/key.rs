use std::path::{Component, Path};

use crate::Result;

/// ローカルパスからリモートのキーを作成
///
/// `root` からの相対パスを `prefix` と `/` で連結し、区切り文字を `/` に統一して
/// 先頭の `/` を取り除く。`path` が `root` の配下にない場合はエラー。
pub fn object_key(root: &Path, path: &Path, prefix: &str) -> Result<String> {
    let relative_path = path.strip_prefix(root).map_err(|_| {
        crate::Error::InvalidPath(format!(
            "{} is not under {}",
            path.display(),
            root.display()
        ))
    })?;

    let relative = relative_segments(relative_path);
    let key = format!("{}/{}", prefix, relative).replace('\\', "/");

    Ok(key.trim_start_matches('/').to_string())
}

/// ファイル名をキーとして使う（upload-file でキー未指定の場合）
pub fn file_name_key(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or_else(|| crate::Error::InvalidPath(format!("{} has no file name", path.display())))
}

// OS の区切り文字ではなく `/` でコンポーネントを連結する
fn relative_segments(relative_path: &Path) -> String {
    relative_path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
