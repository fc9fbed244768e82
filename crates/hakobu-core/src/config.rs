use std::env;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Result;

pub const AZURE_CONNECTION_STRING_ENV: &str = "AZURE_STORAGE_CONNECTION_STRING";
pub const AZURE_CONTAINER_ENV: &str = "AZURE_CONTAINER_NAME";

pub const OCI_CONFIG_FILE_ENV: &str = "OCI_CONFIG_FILE";
pub const OCI_PROFILE_ENV: &str = "OCI_PROFILE";
pub const OCI_NAMESPACE_ENV: &str = "OCI_NAMESPACE";
pub const OCI_BUCKET_ENV: &str = "OCI_BUCKET_NAME";
pub const OCI_COMPARTMENT_ENV: &str = "OCI_COMPARTMENT_ID";

pub const CONFIG_PATH_ENV: &str = "HAKOBU_CONFIG";

const DEFAULT_OCI_PROFILE: &str = "DEFAULT";

/// Hakobu 設定ファイル（~/.hakobu/config.toml）
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub azure: Option<AzureConfig>,
    pub oci: Option<OciConfig>,
}

/// Azure 設定（すべてオプション、フラグ・環境変数優先）
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AzureConfig {
    pub connection_string: Option<String>,
    pub container: Option<String>,
}

/// OCI 設定（すべてオプション、フラグ・環境変数優先）
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OciConfig {
    pub config_file: Option<PathBuf>,
    pub profile: Option<String>,
    pub namespace: Option<String>,
    pub bucket: Option<String>,
    pub compartment_id: Option<String>,
}

/// コマンドラインで指定された Azure の値
#[derive(Debug, Clone, Default)]
pub struct AzureOverrides {
    pub connection_string: Option<String>,
    pub container: Option<String>,
}

/// コマンドラインで指定された OCI の値
#[derive(Debug, Clone, Default)]
pub struct OciOverrides {
    pub config_file: Option<PathBuf>,
    pub profile: Option<String>,
    pub namespace: Option<String>,
    pub bucket: Option<String>,
    pub compartment_id: Option<String>,
}

/// 解決済みの Azure 接続情報
#[derive(Clone)]
pub struct AzureSettings {
    pub connection_string: String,
    pub container: String,
}

// 接続文字列はログに出さない
impl std::fmt::Debug for AzureSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureSettings")
            .field("connection_string", &"<redacted>")
            .field("container", &self.container)
            .finish()
    }
}

/// 解決済みの OCI 接続情報
#[derive(Debug, Clone)]
pub struct OciSettings {
    pub config_file: PathBuf,
    pub profile: String,
    /// 未指定の場合は接続時に `oci os ns get` で取得
    pub namespace: Option<String>,
    pub bucket: String,
    /// 未指定の場合はプロファイルの tenancy を使う
    pub compartment_id: Option<String>,
}

impl Config {
    /// 設定ファイルのパスを取得（HOME も HAKOBU_CONFIG もなければ None）
    pub fn config_path() -> Option<PathBuf> {
        Self::config_path_with(|key| env::var(key).ok())
    }

    pub fn config_path_with<F>(env: F) -> Option<PathBuf>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = non_empty(env(CONFIG_PATH_ENV)) {
            return Some(PathBuf::from(path));
        }
        home_from(&env).map(|home| home.join(".hakobu").join("config.toml"))
    }

    /// 設定を読み込み（ファイルがなければデフォルト）
    pub fn load() -> Result<Self> {
        Self::load_with(|key| env::var(key).ok())
    }

    pub fn load_with<F>(env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        match Self::config_path_with(env) {
            Some(path) => Self::load_from(&path),
            None => Ok(Config::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            crate::Error::Config(format!("Failed to read config file: {}", e))
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| {
            crate::Error::Config(format!("Failed to parse config file: {}", e))
        })?;

        Ok(config)
    }

    /// 環境変数から Azure 接続情報を解決
    pub fn azure_settings(&self, overrides: AzureOverrides) -> Result<AzureSettings> {
        self.azure_settings_with(overrides, |key| env::var(key).ok())
    }

    /// Azure 接続情報を解決（フラグ > 環境変数 > 設定ファイル）
    pub fn azure_settings_with<F>(&self, overrides: AzureOverrides, env: F) -> Result<AzureSettings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = self.azure.clone().unwrap_or_default();

        let connection_string = pick(
            overrides.connection_string,
            env(AZURE_CONNECTION_STRING_ENV),
            file.connection_string,
        )
        .ok_or_else(|| {
            crate::Error::Config("Azure Storage connection string not provided".into())
        })?;

        let container = pick(overrides.container, env(AZURE_CONTAINER_ENV), file.container)
            .ok_or_else(|| crate::Error::Config("Azure Container name not provided".into()))?;

        Ok(AzureSettings {
            connection_string,
            container,
        })
    }

    /// 環境変数から OCI 接続情報を解決
    pub fn oci_settings(&self, overrides: OciOverrides) -> Result<OciSettings> {
        self.oci_settings_with(overrides, |key| env::var(key).ok())
    }

    /// OCI 接続情報を解決（フラグ > 環境変数 > 設定ファイル）
    pub fn oci_settings_with<F>(&self, overrides: OciOverrides, env: F) -> Result<OciSettings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = self.oci.clone().unwrap_or_default();

        let bucket = pick(overrides.bucket, env(OCI_BUCKET_ENV), file.bucket)
            .ok_or_else(|| crate::Error::Config("OCI bucket name not provided".into()))?;

        let home = home_from(&env);
        let config_file = match pick(
            overrides.config_file,
            env(OCI_CONFIG_FILE_ENV).map(PathBuf::from),
            file.config_file,
        ) {
            Some(path) => path,
            None => home
                .as_ref()
                .map(|home| home.join(".oci").join("config"))
                .ok_or_else(|| {
                    crate::Error::Config(
                        "HOME is not set; pass --config-file or set OCI_CONFIG_FILE".into(),
                    )
                })?,
        };

        let profile = pick(overrides.profile, env(OCI_PROFILE_ENV), file.profile)
            .unwrap_or_else(|| DEFAULT_OCI_PROFILE.to_string());

        Ok(OciSettings {
            config_file: expand_home(config_file, home.as_deref()),
            profile,
            namespace: pick(overrides.namespace, env(OCI_NAMESPACE_ENV), file.namespace),
            bucket,
            compartment_id: pick(
                overrides.compartment_id,
                env(OCI_COMPARTMENT_ENV),
                file.compartment_id,
            ),
        })
    }
}

// 空文字列は未指定として扱う
fn pick<T: AsRef<OsStr>>(flag: Option<T>, env: Option<T>, file: Option<T>) -> Option<T> {
    [flag, env, file]
        .into_iter()
        .flatten()
        .find(|v| !AsRef::<OsStr>::as_ref(v).is_empty())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn home_from<F>(env: &F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(env("HOME")).map(PathBuf::from)
}

/// 先頭の `~/` をホームディレクトリに展開
fn expand_home(path: PathBuf, home: Option<&Path>) -> PathBuf {
    if let (Ok(rest), Some(home)) = (path.strip_prefix("~"), home) {
        return home.join(rest);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_azure_flag_wins_over_env() -> Result<()> {
        let config = Config::default();
        let env = env_from(&[
            (AZURE_CONNECTION_STRING_ENV, "AccountName=from-env"),
            (AZURE_CONTAINER_ENV, "env-container"),
        ]);

        let settings = config.azure_settings_with(
            AzureOverrides {
                connection_string: None,
                container: Some("flag-container".to_string()),
            },
            env,
        )?;

        assert_eq!(settings.connection_string, "AccountName=from-env");
        assert_eq!(settings.container, "flag-container");
        Ok(())
    }

    #[test]
    fn test_azure_falls_back_to_config_file() -> Result<()> {
        let config = Config {
            azure: Some(AzureConfig {
                connection_string: Some("AccountName=from-file".to_string()),
                container: Some("file-container".to_string()),
            }),
            oci: None,
        };

        let settings = config.azure_settings_with(AzureOverrides::default(), env_from(&[]))?;
        assert_eq!(settings.container, "file-container");
        Ok(())
    }

    #[test]
    fn test_azure_missing_connection_string() {
        let config = Config::default();
        let result = config.azure_settings_with(
            AzureOverrides {
                connection_string: Some(String::new()),
                container: Some("c".to_string()),
            },
            env_from(&[]),
        );

        assert!(matches!(result, Err(crate::Error::Config(_))));
    }

    #[test]
    fn test_azure_settings_debug_redacts_secret() -> Result<()> {
        let settings = Config::default().azure_settings_with(
            AzureOverrides {
                connection_string: Some("AccountKey=topsecret".to_string()),
                container: Some("c".to_string()),
            },
            env_from(&[]),
        )?;

        assert!(!format!("{:?}", settings).contains("topsecret"));
        Ok(())
    }

    #[test]
    fn test_oci_defaults() -> Result<()> {
        let config = Config::default();
        let settings = config.oci_settings_with(
            OciOverrides::default(),
            env_from(&[
                (OCI_BUCKET_ENV, "my-bucket"),
                (OCI_CONFIG_FILE_ENV, "/etc/oci/config"),
            ]),
        )?;

        assert_eq!(settings.bucket, "my-bucket");
        assert_eq!(settings.profile, "DEFAULT");
        assert_eq!(settings.config_file, PathBuf::from("/etc/oci/config"));
        assert!(settings.namespace.is_none());
        Ok(())
    }

    #[test]
    fn test_oci_missing_bucket() {
        let result = Config::default().oci_settings_with(OciOverrides::default(), env_from(&[]));
        assert!(matches!(result, Err(crate::Error::Config(_))));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config {
            azure: None,
            oci: Some(OciConfig {
                config_file: None,
                profile: Some("PROD".to_string()),
                namespace: Some("axnamespace".to_string()),
                bucket: Some("backups".to_string()),
                compartment_id: None,
            }),
        };

        let toml = toml::to_string(&config).unwrap();
        assert!(toml.contains("backups"));

        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.oci.unwrap().profile.as_deref(), Some("PROD"));
    }

    #[test]
    fn test_load_without_home_uses_defaults() -> Result<()> {
        assert!(Config::config_path_with(env_from(&[])).is_none());

        let config = Config::load_with(env_from(&[]))?;
        let settings = config.azure_settings_with(
            AzureOverrides {
                connection_string: Some("AccountName=x".to_string()),
                container: Some("c".to_string()),
            },
            env_from(&[]),
        )?;

        assert_eq!(settings.container, "c");
        Ok(())
    }

    #[test]
    fn test_config_path_env_override() -> Result<()> {
        let temp = tempfile::TempDir::new()?;
        let path = temp.path().join("hakobu.toml");
        fs::write(&path, "[azure]\ncontainer = \"from-file\"\n")?;

        let path_str = path.to_string_lossy().to_string();
        let config = Config::load_with(env_from(&[(CONFIG_PATH_ENV, path_str.as_str())]))?;

        assert_eq!(
            config.azure.and_then(|a| a.container).as_deref(),
            Some("from-file")
        );
        Ok(())
    }

    #[test]
    fn test_oci_default_config_file_needs_home() -> Result<()> {
        let config = Config::default();

        let result = config.oci_settings_with(
            OciOverrides::default(),
            env_from(&[(OCI_BUCKET_ENV, "b")]),
        );
        assert!(matches!(result, Err(crate::Error::Config(_))));

        let settings = config.oci_settings_with(
            OciOverrides::default(),
            env_from(&[(OCI_BUCKET_ENV, "b"), ("HOME", "/home/hakobu")]),
        )?;
        assert_eq!(settings.config_file, PathBuf::from("/home/hakobu/.oci/config"));

        let settings = config.oci_settings_with(
            OciOverrides {
                config_file: Some(PathBuf::from("~/oci/alt")),
                ..OciOverrides::default()
            },
            env_from(&[(OCI_BUCKET_ENV, "b"), ("HOME", "/home/hakobu")]),
        )?;
        assert_eq!(settings.config_file, PathBuf::from("/home/hakobu/oci/alt"));
        Ok(())
    }

    #[test]
    fn test_load_from_missing_file() -> Result<()> {
        let temp = tempfile::TempDir::new()?;
        let config = Config::load_from(&temp.path().join("nope.toml"))?;
        assert!(config.azure.is_none());
        Ok(())
    }

    #[test]
    fn test_load_from_invalid_file() -> Result<()> {
        let temp = tempfile::TempDir::new()?;
        let path = temp.path().join("config.toml");
        fs::write(&path, "azure = [broken")?;

        assert!(matches!(
            Config::load_from(&path),
            Err(crate::Error::Config(_))
        ));
        Ok(())
    }
}
