use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// リモートのオブジェクト（list の結果）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObject {
    /// キー（Blob 名 / Object 名）
    pub key: String,
    /// サイズ（バイト）
    pub size: u64,
}

/// コンテナ（バケット）の確認結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerStatus {
    /// 既に存在していた
    Existing,
    /// 新しく作成した
    Created,
}

/// オブジェクトストレージクライアントの共通インターフェース
pub trait ObjectStore {
    /// 表示用の名前（例: "Azure Blob Storage"）
    fn name(&self) -> &str;

    /// コンテナ（バケット）名
    fn container(&self) -> &str;

    /// コンテナが存在しなければ作成
    fn ensure_container(&self) -> Result<ContainerStatus>;

    /// ファイルをアップロード（同名のキーは上書き）
    fn put_object(&self, local_path: &Path, key: &str) -> Result<()>;

    /// オブジェクトをダウンロードして `local_path` に書き込む
    ///
    /// 親ディレクトリは呼び出し側で作成済みであること。
    fn get_object(&self, key: &str, local_path: &Path) -> Result<()>;

    /// prefix に一致するオブジェクト一覧を取得
    fn list_objects(&self, prefix: &str) -> Result<Vec<RemoteObject>>;
}
