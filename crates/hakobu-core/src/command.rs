use std::ffi::{OsStr, OsString};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::Result;

/// ベンダー CLI（az / oci）の呼び出し
///
/// 引数は argv に、秘密情報は `secret_env` で子プロセスの環境変数として渡す。
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: String,
    args: Vec<OsString>,
    secret_env: Vec<(String, String)>,
}

impl ToolCommand {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            secret_env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// `--flag value` の組を追加
    pub fn opt(self, flag: &str, value: impl AsRef<OsStr>) -> Self {
        self.arg(flag).arg(value)
    }

    /// ログに出さない環境変数を設定
    pub fn secret_env(mut self, key: &str, value: &str) -> Self {
        self.secret_env.push((key.to_string(), value.to_string()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// `--flag` の直後の値を取得
    pub fn value_of(&self, flag: &str) -> Option<&OsStr> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(|v| v.as_os_str())
    }

    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    pub fn has_secret_env(&self, key: &str) -> bool {
        self.secret_env.iter().any(|(k, _)| k == key)
    }

    /// 実行して標準出力を返す（失敗時は標準エラーをメッセージにする）
    pub fn output(&self) -> Result<String> {
        debug!(
            program = %self.program,
            args = ?self.args,
            "Running vendor CLI"
        );

        let output = Command::new(&self.program)
            .args(&self.args)
            .envs(self.secret_env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .output()
            .map_err(|e| crate::Error::Spawn {
                program: self.program.clone(),
                source: e,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(crate::Error::Remote(format!(
                "{} {} failed: {}",
                self.program,
                self.subcommand(),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    // エラーメッセージ用（フラグより前の部分）
    fn subcommand(&self) -> String {
        self.args
            .iter()
            .take_while(|a| !a.to_string_lossy().starts_with('-'))
            .map(|a| a.to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// CLI がインストールされているか確認
pub fn is_installed(program: &str) -> bool {
    Command::new(program)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_args() {
        let cmd = ToolCommand::new("az")
            .arg("storage")
            .arg("blob")
            .arg("upload")
            .opt("--name", "a/b.txt")
            .arg("--overwrite");

        assert_eq!(cmd.program(), "az");
        assert_eq!(cmd.get_args().len(), 6);
        assert_eq!(cmd.value_of("--name"), Some(OsStr::new("a/b.txt")));
        assert!(cmd.has_arg("--overwrite"));
        assert_eq!(cmd.subcommand(), "storage blob upload");
    }

    #[test]
    fn test_secret_env_not_in_args() {
        let cmd = ToolCommand::new("az")
            .arg("storage")
            .secret_env("AZURE_STORAGE_CONNECTION_STRING", "AccountKey=secret");

        assert!(cmd.has_secret_env("AZURE_STORAGE_CONNECTION_STRING"));
        assert!(!cmd
            .get_args()
            .iter()
            .any(|a| a.to_string_lossy().contains("secret")));
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let result = ToolCommand::new("hakobu-no-such-tool-xyz").arg("x").output();
        assert!(matches!(result, Err(crate::Error::Spawn { .. })));
        assert!(!is_installed("hakobu-no-such-tool-xyz"));
    }
}
