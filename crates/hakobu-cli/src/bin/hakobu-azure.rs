use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use hakobu_cli::request::AZURE_FLAGS;
use hakobu_cli::{app, Action, CommonArgs, RequestArgs};
use hakobu_core::azure::AzureBlobClient;
use hakobu_core::config::{AzureOverrides, Config};
use tracing::error;

#[derive(Parser)]
#[command(name = "hakobu-azure")]
#[command(author, version, about = "Azure Blob Storage とローカル間でファイルを転送", long_about = None)]
struct Cli {
    /// 実行するアクション
    #[arg(value_enum)]
    action: Action,

    /// Azure Storage 接続文字列（未指定時: AZURE_STORAGE_CONNECTION_STRING）
    #[arg(long)]
    connection_string: Option<String>,

    /// コンテナ名（未指定時: AZURE_CONTAINER_NAME）
    #[arg(long)]
    container: Option<String>,

    /// ローカルのファイルまたはディレクトリ
    #[arg(long)]
    local_path: Option<PathBuf>,

    /// Blob 名
    #[arg(long)]
    blob_name: Option<String>,

    /// Blob 名の prefix（ディレクトリアップロード・一覧用）
    #[arg(long, default_value = "")]
    blob_prefix: String,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> Result<()> {
    let cli: Cli = hakobu_cli::parse_args();
    hakobu_cli::init(&cli.common)?;

    run(cli).inspect_err(|e| error!("Application error: {:#}", e))
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let settings = config.azure_settings(AzureOverrides {
        connection_string: cli.connection_string,
        container: cli.container,
    })?;

    let args = RequestArgs {
        action: cli.action,
        local_path: cli.local_path,
        name: cli.blob_name,
        prefix: cli.blob_prefix,
        flags: AZURE_FLAGS,
    };

    app::dispatch(args, &cli.common, || AzureBlobClient::connect(settings))
}
