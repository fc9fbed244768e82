pub mod app;
pub mod logging;
pub mod output;
pub mod request;

use std::path::PathBuf;

use clap::{Args, Parser};

pub use request::{Action, FlagNames, Request, RequestArgs};

/// 両方のバイナリに共通のオプション
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// 結果を JSON で標準出力に表示
    #[arg(long)]
    pub json: bool,

    /// ログファイルのパス（環境変数 HAKOBU_LOG_FILE でも指定可）
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// 引数をパースする（エラー時は終了コード 1、--help / --version は 0）
pub fn parse_args<T: Parser>() -> T {
    T::try_parse().unwrap_or_else(|e| {
        let code = exit_code(&e);
        let _ = e.print();
        std::process::exit(code);
    })
}

/// clap のエラーを終了コードに変換
pub fn exit_code(err: &clap::Error) -> i32 {
    if err.use_stderr() {
        1
    } else {
        0
    }
}

/// .env の読み込みとロギングの初期化
pub fn init(common: &CommonArgs) -> anyhow::Result<()> {
    // .env がなくてもエラーにしない
    dotenvy::dotenv().ok();

    let log_file = common
        .log_file
        .clone()
        .or_else(|| std::env::var_os(logging::LOG_FILE_ENV).map(PathBuf::from));
    logging::init(log_file.as_deref())
}
