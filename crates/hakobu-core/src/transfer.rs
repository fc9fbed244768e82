use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::{key, ObjectStore, RemoteObject, Result};

/// 転送したファイル
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferredFile {
    /// ローカルパス
    pub local_path: PathBuf,
    /// リモートのキー
    pub remote_key: String,
    /// サイズ（バイト）
    pub size: u64,
}

/// ディレクトリアップロードの集計
#[derive(Debug, Clone, Serialize)]
pub struct TransferStats {
    pub success_count: usize,
    pub failed_count: usize,
    /// 成功したファイルの合計サイズ
    pub total_size: u64,
    /// 成功したファイル（アップロード順）
    pub files: Vec<TransferredFile>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl TransferStats {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            success_count: 0,
            failed_count: 0,
            total_size: 0,
            files: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }

    fn record(&mut self, file: TransferredFile) {
        self.success_count += 1;
        self.total_size += file.size;
        self.files.push(file);
    }

    /// 失敗が 1 件もないか
    pub fn is_success(&self) -> bool {
        self.failed_count == 0
    }

    pub fn formatted_size(&self) -> String {
        crate::utils::format_size(self.total_size)
    }
}

/// ディレクトリアップロードの進捗
#[derive(Debug)]
pub enum UploadEvent<'a> {
    /// アップロード対象のファイル数が確定した
    Started { total: usize },
    Uploaded(&'a TransferredFile),
    Failed {
        local_path: &'a Path,
        key: &'a str,
        error: &'a crate::Error,
    },
}

/// ローカルとリモート間の転送
pub struct Transfer<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: ObjectStore + ?Sized> Transfer<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// 単一ファイルをアップロード（キー未指定ならファイル名）
    pub fn upload_file(&self, local_path: &Path, key: Option<&str>) -> Result<TransferredFile> {
        let result = self.try_upload_file(local_path, key);
        if let Err(e) = &result {
            error!("Failed to upload {}: {}", local_path.display(), e);
        }
        result
    }

    fn try_upload_file(&self, local_path: &Path, key: Option<&str>) -> Result<TransferredFile> {
        if !local_path.exists() {
            return Err(crate::Error::NotFound(local_path.to_path_buf()));
        }

        let metadata = fs::metadata(local_path)?;
        if !metadata.is_file() {
            return Err(crate::Error::NotAFile(local_path.to_path_buf()));
        }

        let remote_key = match key {
            Some(k) => k.to_string(),
            None => key::file_name_key(local_path)?,
        };

        self.store.put_object(local_path, &remote_key)?;

        let file = TransferredFile {
            local_path: local_path.to_path_buf(),
            remote_key,
            size: metadata.len(),
        };
        info!(
            "Successfully uploaded: {} -> {} ({} bytes)",
            file.local_path.display(),
            file.remote_key,
            file.size
        );
        Ok(file)
    }

    /// ディレクトリ以下のファイルを再帰的にアップロード
    pub fn upload_directory(&self, local_dir: &Path, prefix: &str) -> Result<TransferStats> {
        self.upload_directory_with(local_dir, prefix, |_| {})
    }

    /// 進捗コールバック付きのディレクトリアップロード
    ///
    /// 個別ファイルの失敗は `failed_count` に数えて続行する。
    /// ディレクトリ自体が不正な場合のみエラーを返す。
    pub fn upload_directory_with<F>(
        &self,
        local_dir: &Path,
        prefix: &str,
        mut on_event: F,
    ) -> Result<TransferStats>
    where
        F: FnMut(UploadEvent<'_>),
    {
        let files = collect_files(local_dir).inspect_err(|e| error!("{}", e))?;
        info!(
            "Found {} files to upload in {}",
            files.len(),
            local_dir.display()
        );
        on_event(UploadEvent::Started { total: files.len() });

        let mut stats = TransferStats::new();

        for path in &files {
            let remote_key = match key::object_key(local_dir, path, prefix) {
                Ok(k) => k,
                Err(e) => {
                    error!("Failed to map {} to a key: {}", path.display(), e);
                    on_event(UploadEvent::Failed {
                        local_path: path,
                        key: "",
                        error: &e,
                    });
                    stats.failed_count += 1;
                    continue;
                }
            };

            match self.upload_file(path, Some(&remote_key)) {
                Ok(file) => {
                    on_event(UploadEvent::Uploaded(&file));
                    stats.record(file);
                }
                Err(e) => {
                    on_event(UploadEvent::Failed {
                        local_path: path,
                        key: &remote_key,
                        error: &e,
                    });
                    stats.failed_count += 1;
                }
            }
        }

        stats.finished_at = Utc::now();
        info!(
            "Upload complete: {} succeeded, {} failed, {} bytes total",
            stats.success_count, stats.failed_count, stats.total_size
        );
        Ok(stats)
    }

    /// prefix に一致するオブジェクトを一覧
    pub fn list(&self, prefix: &str) -> Result<Vec<RemoteObject>> {
        let objects = self
            .store
            .list_objects(prefix)
            .inspect_err(|e| error!("Failed to list objects: {}", e))?;

        info!("Objects in '{}':", self.store.container());
        for object in &objects {
            info!("  - {} ({} bytes)", object.key, object.size);
        }
        Ok(objects)
    }

    /// オブジェクトをダウンロード（親ディレクトリは自動作成）
    pub fn download(&self, key: &str, local_path: &Path) -> Result<u64> {
        let result = self.try_download(key, local_path);
        match &result {
            Ok(_) => info!(
                "Successfully downloaded: {} -> {}",
                key,
                local_path.display()
            ),
            Err(e) => error!("Failed to download {}: {}", key, e),
        }
        result
    }

    fn try_download(&self, key: &str, local_path: &Path) -> Result<u64> {
        if let Some(parent) = local_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        self.store.get_object(key, local_path)?;
        Ok(fs::metadata(local_path)?.len())
    }
}

/// ディレクトリ以下の通常ファイルを列挙（シンボリックリンクは辿る）
pub fn collect_files(local_dir: &Path) -> Result<Vec<PathBuf>> {
    if !local_dir.exists() {
        return Err(crate::Error::NotFound(local_dir.to_path_buf()));
    }
    if !local_dir.is_dir() {
        return Err(crate::Error::NotADirectory(local_dir.to_path_buf()));
    }

    Ok(WalkDir::new(local_dir)
        .follow_links(true)
        .into_iter()
        // リンクのループや読めないエントリはスキップ
        .filter_map(|e| e.inspect_err(|e| warn!("Skipping entry: {}", e)).ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect())
}
