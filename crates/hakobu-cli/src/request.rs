use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::ValueEnum;

/// 実行するアクション
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Action {
    /// 単一ファイルをアップロード
    UploadFile,
    /// ディレクトリを再帰的にアップロード
    UploadDir,
    /// オブジェクト一覧を表示
    List,
    /// オブジェクトをダウンロード
    Download,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::UploadFile => "upload-file",
            Action::UploadDir => "upload-dir",
            Action::List => "list",
            Action::Download => "download",
        }
    }
}

/// バイナリごとのフラグ名（エラーメッセージ用）
#[derive(Debug, Clone, Copy)]
pub struct FlagNames {
    /// 例: "--blob-name" / "--object-name"
    pub name: &'static str,
}

pub const AZURE_FLAGS: FlagNames = FlagNames { name: "--blob-name" };
pub const OCI_FLAGS: FlagNames = FlagNames { name: "--object-name" };

/// パース直後の引数
#[derive(Debug, Clone)]
pub struct RequestArgs {
    pub action: Action,
    pub local_path: Option<PathBuf>,
    pub name: Option<String>,
    pub prefix: String,
    pub flags: FlagNames,
}

/// 検証済みのリクエスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    UploadFile {
        local_path: PathBuf,
        key: Option<String>,
    },
    UploadDir {
        local_path: PathBuf,
        prefix: String,
    },
    List {
        prefix: String,
    },
    Download {
        key: String,
        local_path: PathBuf,
    },
}

impl Request {
    /// アクションごとの必須フラグを確認
    pub fn new(args: RequestArgs) -> Result<Self> {
        let RequestArgs {
            action,
            local_path,
            name,
            prefix,
            flags,
        } = args;

        let request = match action {
            Action::UploadFile | Action::UploadDir => {
                let Some(local_path) = local_path else {
                    bail!("--local-path is required for {} action", action.as_str());
                };
                if action == Action::UploadFile {
                    Request::UploadFile {
                        local_path,
                        key: name.filter(|n| !n.is_empty()),
                    }
                } else {
                    Request::UploadDir { local_path, prefix }
                }
            }
            Action::List => Request::List { prefix },
            Action::Download => match (name.filter(|n| !n.is_empty()), local_path) {
                (Some(key), Some(local_path)) => Request::Download { key, local_path },
                _ => bail!(
                    "{} and --local-path are required for download action",
                    flags.name
                ),
            },
        };

        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(action: Action) -> RequestArgs {
        RequestArgs {
            action,
            local_path: None,
            name: None,
            prefix: String::new(),
            flags: AZURE_FLAGS,
        }
    }

    #[test]
    fn test_upload_file_requires_local_path() {
        let err = Request::new(args(Action::UploadFile)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "--local-path is required for upload-file action"
        );
    }

    #[test]
    fn test_upload_dir_keeps_prefix() -> Result<()> {
        let request = Request::new(RequestArgs {
            local_path: Some(PathBuf::from("./uploads")),
            prefix: "backup".to_string(),
            ..args(Action::UploadDir)
        })?;

        assert_eq!(
            request,
            Request::UploadDir {
                local_path: PathBuf::from("./uploads"),
                prefix: "backup".to_string(),
            }
        );
        Ok(())
    }

    #[test]
    fn test_list_needs_nothing() -> Result<()> {
        assert_eq!(
            Request::new(args(Action::List))?,
            Request::List {
                prefix: String::new()
            }
        );
        Ok(())
    }

    #[test]
    fn test_download_error_uses_binary_flag_name() {
        let err = Request::new(RequestArgs {
            local_path: Some(PathBuf::from("out.bin")),
            flags: OCI_FLAGS,
            ..args(Action::Download)
        })
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "--object-name and --local-path are required for download action"
        );
    }

    #[test]
    fn test_empty_name_is_missing() {
        let result = Request::new(RequestArgs {
            local_path: Some(PathBuf::from("out.bin")),
            name: Some(String::new()),
            ..args(Action::Download)
        });
        assert!(result.is_err());
    }
}
