use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::command::{self, ToolCommand};
use crate::config::{AzureSettings, AZURE_CONNECTION_STRING_ENV};
use crate::{ContainerStatus, ObjectStore, RemoteObject, Result};

const AZ: &str = "az";

/// Azure Storage 接続文字列（`Key=Value;Key=Value`）
#[derive(Clone)]
pub struct ConnectionString {
    pairs: Vec<(String, String)>,
}

impl ConnectionString {
    pub fn parse(raw: &str) -> Result<Self> {
        let mut pairs = Vec::new();

        for (index, segment) in raw
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .enumerate()
        {
            // AccountKey の値には `=` が含まれるので最初の `=` で分割
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                crate::Error::Connection(format!(
                    "Malformed connection string segment #{} (missing '=')",
                    index + 1
                ))
            })?;
            pairs.push((key.trim().to_string(), value.trim().to_string()));
        }

        let parsed = Self { pairs };

        let dev_storage = parsed
            .get("UseDevelopmentStorage")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));
        if parsed.get("AccountName").is_none() && parsed.get("BlobEndpoint").is_none() && !dev_storage
        {
            return Err(crate::Error::Connection(
                "Connection string needs AccountName, BlobEndpoint or UseDevelopmentStorage=true"
                    .into(),
            ));
        }

        Ok(parsed)
    }

    /// キーは大文字小文字を区別しない
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// ログ表示用のアカウント名
    pub fn account_label(&self) -> String {
        if let Some(name) = self.get("AccountName") {
            return name.to_string();
        }
        if let Some(endpoint) = self.get("BlobEndpoint") {
            return endpoint.to_string();
        }
        "devstoreaccount1".to_string()
    }
}

/// Azure CLI (`az storage`) のラッパー
pub struct AzureBlobClient {
    connection_string: String,
    container: String,
    account: String,
}

#[derive(Debug, Deserialize)]
struct ExistsResponse {
    exists: bool,
}

#[derive(Debug, Deserialize)]
struct BlobEntry {
    name: String,
    #[serde(default)]
    properties: BlobProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlobProperties {
    content_length: Option<u64>,
}

impl AzureBlobClient {
    /// 接続文字列を検証してクライアントを作成
    pub fn new(settings: AzureSettings) -> Result<Self> {
        let parsed = ConnectionString::parse(&settings.connection_string)?;

        Ok(Self {
            connection_string: settings.connection_string,
            container: settings.container,
            account: parsed.account_label(),
        })
    }

    /// `new` に加えて az CLI の存在を確認
    pub fn connect(settings: AzureSettings) -> Result<Self> {
        let client = Self::new(settings)?;

        if !command::is_installed(AZ) {
            return Err(crate::Error::ToolNotFound(AZ.to_string()));
        }

        info!(
            account = %client.account,
            "Connected to Azure Storage container: {}",
            client.container
        );
        Ok(client)
    }

    fn az(&self) -> ToolCommand {
        ToolCommand::new(AZ)
            .arg("storage")
            .secret_env(AZURE_CONNECTION_STRING_ENV, &self.connection_string)
    }

    fn exists_command(&self) -> ToolCommand {
        self.az()
            .arg("container")
            .arg("exists")
            .opt("--name", &self.container)
            .opt("--output", "json")
    }

    fn create_command(&self) -> ToolCommand {
        self.az()
            .arg("container")
            .arg("create")
            .opt("--name", &self.container)
            .opt("--output", "none")
    }

    fn upload_command(&self, local_path: &Path, key: &str) -> ToolCommand {
        self.az()
            .arg("blob")
            .arg("upload")
            .opt("--container-name", &self.container)
            .opt("--name", key)
            .opt("--file", local_path)
            .arg("--overwrite")
            .arg("--no-progress")
            .arg("--only-show-errors")
            .opt("--output", "none")
    }

    fn download_command(&self, key: &str, local_path: &Path) -> ToolCommand {
        self.az()
            .arg("blob")
            .arg("download")
            .opt("--container-name", &self.container)
            .opt("--name", key)
            .opt("--file", local_path)
            .arg("--no-progress")
            .arg("--only-show-errors")
            .opt("--output", "none")
    }

    fn list_command(&self, prefix: &str) -> ToolCommand {
        let cmd = self
            .az()
            .arg("blob")
            .arg("list")
            .opt("--container-name", &self.container)
            .opt("--num-results", "*")
            .arg("--only-show-errors")
            .opt("--output", "json");

        if prefix.is_empty() {
            cmd
        } else {
            cmd.opt("--prefix", prefix)
        }
    }
}

fn parse_blob_list(stdout: &str) -> Result<Vec<RemoteObject>> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }

    let entries: Vec<BlobEntry> = serde_json::from_str(stdout)?;
    Ok(entries
        .into_iter()
        .map(|e| RemoteObject {
            key: e.name,
            size: e.properties.content_length.unwrap_or(0),
        })
        .collect())
}

impl ObjectStore for AzureBlobClient {
    fn name(&self) -> &str {
        "Azure Blob Storage"
    }

    fn container(&self) -> &str {
        &self.container
    }

    fn ensure_container(&self) -> Result<ContainerStatus> {
        let stdout = self.exists_command().output()?;
        let response: ExistsResponse = serde_json::from_str(&stdout)?;

        if response.exists {
            info!("Container '{}' already exists", self.container);
            return Ok(ContainerStatus::Existing);
        }

        self.create_command().output()?;
        info!("Created container: {}", self.container);
        Ok(ContainerStatus::Created)
    }

    fn put_object(&self, local_path: &Path, key: &str) -> Result<()> {
        self.upload_command(local_path, key).output()?;
        Ok(())
    }

    fn get_object(&self, key: &str, local_path: &Path) -> Result<()> {
        self.download_command(key, local_path).output()?;
        Ok(())
    }

    fn list_objects(&self, prefix: &str) -> Result<Vec<RemoteObject>> {
        let stdout = self.list_command(prefix).output()?;
        parse_blob_list(&stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    const CONN: &str = "DefaultEndpointsProtocol=https;AccountName=hakobu;AccountKey=abc+def==;EndpointSuffix=core.windows.net";

    fn client() -> AzureBlobClient {
        AzureBlobClient::new(AzureSettings {
            connection_string: CONN.to_string(),
            container: "uploads".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_parse_connection_string() -> Result<()> {
        let parsed = ConnectionString::parse(CONN)?;

        assert_eq!(parsed.get("accountname"), Some("hakobu"));
        // `=` を含む値が壊れない
        assert_eq!(parsed.get("AccountKey"), Some("abc+def=="));
        assert_eq!(parsed.account_label(), "hakobu");
        Ok(())
    }

    #[test]
    fn test_parse_development_storage() -> Result<()> {
        let parsed = ConnectionString::parse("UseDevelopmentStorage=true")?;
        assert_eq!(parsed.account_label(), "devstoreaccount1");
        Ok(())
    }

    #[test]
    fn test_parse_invalid_connection_string() {
        assert!(matches!(
            ConnectionString::parse("not-a-connection-string"),
            Err(crate::Error::Connection(_))
        ));
        assert!(matches!(
            ConnectionString::parse("DefaultEndpointsProtocol=https;AccountKey=x"),
            Err(crate::Error::Connection(_))
        ));
    }

    #[test]
    fn test_invalid_segment_error_hides_value() {
        let err = ConnectionString::parse("AccountName=a;secretvalue")
            .err()
            .map(|e| e.to_string())
            .unwrap_or_default();
        assert!(err.contains("missing '='"));
        assert!(!err.contains("secretvalue"));
    }

    #[test]
    fn test_upload_command() {
        let cmd = client().upload_command(Path::new("/tmp/a.txt"), "docs/a.txt");

        assert_eq!(cmd.value_of("--container-name"), Some(OsStr::new("uploads")));
        assert_eq!(cmd.value_of("--name"), Some(OsStr::new("docs/a.txt")));
        assert_eq!(cmd.value_of("--file"), Some(OsStr::new("/tmp/a.txt")));
        assert!(cmd.has_arg("--overwrite"));
        // 接続文字列は argv ではなく環境変数で渡す
        assert!(cmd.has_secret_env(AZURE_CONNECTION_STRING_ENV));
        assert!(!cmd
            .get_args()
            .iter()
            .any(|a| a.to_string_lossy().contains("AccountKey")));
    }

    #[test]
    fn test_list_command_prefix() {
        let c = client();
        assert_eq!(c.list_command("").value_of("--prefix"), None);
        assert_eq!(
            c.list_command("logs/").value_of("--prefix"),
            Some(OsStr::new("logs/"))
        );
    }

    #[test]
    fn test_parse_blob_list() -> Result<()> {
        let stdout = r#"[
            {"name": "a.txt", "properties": {"contentLength": 12, "etag": "x"}},
            {"name": "dir/b.bin", "properties": {"contentLength": null}}
        ]"#;

        let objects = parse_blob_list(stdout)?;
        assert_eq!(
            objects,
            vec![
                RemoteObject { key: "a.txt".to_string(), size: 12 },
                RemoteObject { key: "dir/b.bin".to_string(), size: 0 },
            ]
        );
        assert!(parse_blob_list("")?.is_empty());
        Ok(())
    }
}
