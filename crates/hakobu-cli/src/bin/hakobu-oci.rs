use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use hakobu_cli::request::OCI_FLAGS;
use hakobu_cli::{app, Action, CommonArgs, RequestArgs};
use hakobu_core::config::{Config, OciOverrides};
use hakobu_core::oci::OciObjectClient;
use tracing::error;

#[derive(Parser)]
#[command(name = "hakobu-oci")]
#[command(author, version, about = "OCI Object Storage とローカル間でファイルを転送", long_about = None)]
struct Cli {
    /// 実行するアクション
    #[arg(value_enum)]
    action: Action,

    /// OCI 設定ファイル（未指定時: OCI_CONFIG_FILE、~/.oci/config）
    #[arg(long)]
    config_file: Option<PathBuf>,

    /// 設定ファイルのプロファイル（未指定時: OCI_PROFILE、DEFAULT）
    #[arg(long)]
    profile: Option<String>,

    /// Object Storage の namespace（未指定時: OCI_NAMESPACE、なければ自動取得）
    #[arg(long)]
    namespace: Option<String>,

    /// バケット名（未指定時: OCI_BUCKET_NAME）
    #[arg(long)]
    bucket: Option<String>,

    /// バケット作成時の compartment OCID（未指定時: プロファイルの tenancy）
    #[arg(long)]
    compartment_id: Option<String>,

    /// ローカルのファイルまたはディレクトリ
    #[arg(long)]
    local_path: Option<PathBuf>,

    /// Object 名
    #[arg(long)]
    object_name: Option<String>,

    /// Object 名の prefix（ディレクトリアップロード・一覧用）
    #[arg(long, default_value = "")]
    object_prefix: String,

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
    let settings = config.oci_settings(OciOverrides {
        config_file: cli.config_file,
        profile: cli.profile,
        namespace: cli.namespace,
        bucket: cli.bucket,
        compartment_id: cli.compartment_id,
    })?;

    let args = RequestArgs {
        action: cli.action,
        local_path: cli.local_path,
        name: cli.object_name,
        prefix: cli.object_prefix,
        flags: OCI_FLAGS,
    };

    app::dispatch(args, &cli.common, || OciObjectClient::connect(settings))
}
