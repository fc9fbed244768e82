use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::command::{self, ToolCommand};
use crate::config::OciSettings;
use crate::{ContainerStatus, ObjectStore, RemoteObject, Result};

const OCI: &str = "oci";

/// OCI 設定ファイルの 1 プロファイル分のキーと値
pub type Profile = HashMap<String, String>;

/// OCI CLI (`oci os`) のラッパー
pub struct OciObjectClient {
    config_file: PathBuf,
    profile: String,
    namespace: String,
    bucket: String,
    compartment_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamespaceResponse {
    data: String,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    data: Vec<ObjectSummary>,
}

#[derive(Debug, Deserialize)]
struct ObjectSummary {
    name: String,
    size: Option<u64>,
}

/// INI 形式の OCI 設定ファイルからプロファイルを読み込み
pub fn read_profile(config_file: &Path, profile: &str) -> Result<Profile> {
    let content = fs::read_to_string(config_file).map_err(|e| {
        crate::Error::Connection(format!(
            "Failed to read OCI config file {}: {}",
            config_file.display(),
            e
        ))
    })?;

    parse_profile(&content, profile).ok_or_else(|| {
        crate::Error::Connection(format!(
            "Profile [{}] not found in {}",
            profile,
            config_file.display()
        ))
    })
}

const DEFAULT_SECTION: &str = "DEFAULT";

// 名前付きプロファイルは [DEFAULT] のキーを継承し、同じキーは上書きする
fn parse_profile(content: &str, profile: &str) -> Option<Profile> {
    let mut sections: HashMap<&str, Profile> = HashMap::new();
    let mut current: Option<&str> = None;

    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let name = section.trim();
            sections.entry(name).or_default();
            current = Some(name);
            continue;
        }

        if let (Some(name), Some((key, value))) = (current, line.split_once('=')) {
            sections
                .entry(name)
                .or_default()
                .insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    let named = sections.remove(profile)?;
    let mut values = sections.remove(DEFAULT_SECTION).unwrap_or_default();
    values.extend(named);
    Some(values)
}

impl OciObjectClient {
    /// 解決済みの namespace とプロファイルからクライアントを作成
    pub fn new(settings: OciSettings, namespace: String, profile: &Profile) -> Self {
        let compartment_id = settings
            .compartment_id
            .or_else(|| profile.get("tenancy").cloned());

        Self {
            config_file: settings.config_file,
            profile: settings.profile,
            namespace,
            bucket: settings.bucket,
            compartment_id,
        }
    }

    /// 設定ファイルと oci CLI を確認し、必要なら namespace を取得
    pub fn connect(settings: OciSettings) -> Result<Self> {
        let profile = read_profile(&settings.config_file, &settings.profile)?;

        if !command::is_installed(OCI) {
            return Err(crate::Error::ToolNotFound(OCI.to_string()));
        }

        let namespace = match settings.namespace.clone() {
            Some(ns) => ns,
            None => {
                let stdout = with_auth(
                    ToolCommand::new(OCI).arg("os").arg("ns").arg("get"),
                    &settings.config_file,
                    &settings.profile,
                )
                .output()
                .map_err(|e| crate::Error::Connection(format!("Failed to get namespace: {}", e)))?;
                serde_json::from_str::<NamespaceResponse>(&stdout)?.data
            }
        };

        let client = Self::new(settings, namespace, &profile);
        info!(
            profile = %client.profile,
            namespace = %client.namespace,
            "Connected to OCI Object Storage bucket: {}",
            client.bucket
        );
        Ok(client)
    }

    fn os(&self, resource: &str, verb: &str) -> ToolCommand {
        ToolCommand::new(OCI)
            .arg("os")
            .arg(resource)
            .arg(verb)
            .opt("--namespace", &self.namespace)
    }

    fn finish(&self, cmd: ToolCommand) -> ToolCommand {
        with_auth(cmd, &self.config_file, &self.profile)
    }

    fn bucket_get_command(&self) -> ToolCommand {
        self.finish(self.os("bucket", "get").opt("--bucket-name", &self.bucket))
    }

    fn bucket_create_command(&self) -> Result<ToolCommand> {
        let compartment = self.compartment_id.as_deref().ok_or_else(|| {
            crate::Error::Config(
                "Compartment id is required to create a bucket (no tenancy in profile)".into(),
            )
        })?;

        Ok(self.finish(
            self.os("bucket", "create")
                .opt("--name", &self.bucket)
                .opt("--compartment-id", compartment),
        ))
    }

    fn put_command(&self, local_path: &Path, key: &str) -> ToolCommand {
        self.finish(
            self.os("object", "put")
                .opt("--bucket-name", &self.bucket)
                .opt("--name", key)
                .opt("--file", local_path)
                .arg("--force"),
        )
    }

    fn get_command(&self, key: &str, local_path: &Path) -> ToolCommand {
        self.finish(
            self.os("object", "get")
                .opt("--bucket-name", &self.bucket)
                .opt("--name", key)
                .opt("--file", local_path),
        )
    }

    fn list_command(&self, prefix: &str) -> ToolCommand {
        let cmd = self
            .os("object", "list")
            .opt("--bucket-name", &self.bucket)
            .arg("--all")
            .opt("--fields", "size");

        if prefix.is_empty() {
            self.finish(cmd)
        } else {
            self.finish(cmd.opt("--prefix", prefix))
        }
    }
}

fn with_auth(cmd: ToolCommand, config_file: &Path, profile: &str) -> ToolCommand {
    cmd.opt("--config-file", config_file).opt("--profile", profile)
}

fn parse_object_list(stdout: &str) -> Result<Vec<RemoteObject>> {
    // 空のバケットでは何も出力されない
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }

    let response: ListResponse = serde_json::from_str(stdout)?;
    Ok(response
        .data
        .into_iter()
        .map(|o| RemoteObject {
            key: o.name,
            size: o.size.unwrap_or(0),
        })
        .collect())
}

impl ObjectStore for OciObjectClient {
    fn name(&self) -> &str {
        "OCI Object Storage"
    }

    fn container(&self) -> &str {
        &self.bucket
    }

    fn ensure_container(&self) -> Result<ContainerStatus> {
        if self.bucket_get_command().output().is_ok() {
            info!("Bucket '{}' already exists", self.bucket);
            return Ok(ContainerStatus::Existing);
        }

        self.bucket_create_command()?.output()?;
        info!("Created bucket: {}", self.bucket);
        Ok(ContainerStatus::Created)
    }

    fn put_object(&self, local_path: &Path, key: &str) -> Result<()> {
        self.put_command(local_path, key).output()?;
        Ok(())
    }

    fn get_object(&self, key: &str, local_path: &Path) -> Result<()> {
        self.get_command(key, local_path).output()?;
        Ok(())
    }

    fn list_objects(&self, prefix: &str) -> Result<Vec<RemoteObject>> {
        let stdout = self.list_command(prefix).output()?;
        parse_object_list(&stdout)
    }
}
