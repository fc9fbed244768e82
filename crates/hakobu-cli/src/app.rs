use anyhow::{bail, Context, Result};
use hakobu_core::{ObjectStore, Transfer, UploadEvent};
use serde_json::json;

use crate::{output, CommonArgs, Request, RequestArgs};

/// 引数の検証 → 接続 → コンテナ確認 → 実行
///
/// 必須フラグが足りない場合は `connect` を呼ばずにエラーを返す。
pub fn dispatch<S, F>(args: RequestArgs, common: &CommonArgs, connect: F) -> Result<()>
where
    S: ObjectStore,
    F: FnOnce() -> hakobu_core::Result<S>,
{
    let request = Request::new(args)?;

    let store = connect().context("Failed to connect to storage")?;
    let status = store
        .ensure_container()
        .with_context(|| format!("Failed to prepare container '{}'", store.container()))?;

    if !common.json {
        output::container_status(store.name(), store.container(), status);
    }

    execute(&store, &request, common)
}

/// 接続済みのストアでリクエストを実行
pub fn execute<S: ObjectStore + ?Sized>(store: &S, request: &Request, common: &CommonArgs) -> Result<()> {
    let transfer = Transfer::new(store);

    match request {
        Request::UploadFile { local_path, key } => {
            let file = transfer.upload_file(local_path, key.as_deref())?;
            if common.json {
                output::print_json(&file)?;
            } else {
                output::uploaded_file(&file);
            }
        }

        Request::UploadDir { local_path, prefix } => {
            let mut pb = None;
            let mut failed = Vec::new();

            let stats = transfer.upload_directory_with(local_path, prefix, |event| match event {
                UploadEvent::Started { total } => {
                    pb = Some(output::upload_progress(total, common.json));
                }
                UploadEvent::Uploaded(file) => {
                    if let Some(pb) = &pb {
                        pb.inc(1);
                        pb.set_message(file.remote_key.clone());
                    }
                }
                UploadEvent::Failed {
                    local_path, error, ..
                } => {
                    if let Some(pb) = &pb {
                        pb.inc(1);
                    }
                    failed.push((local_path.display().to_string(), error.to_string()));
                }
            })?;

            if let Some(pb) = pb {
                pb.finish_and_clear();
            }

            if common.json {
                output::print_json(&stats)?;
            } else {
                output::upload_summary(&stats, &failed);
            }

            if !stats.is_success() {
                bail!(
                    "{} of {} files failed to upload",
                    stats.failed_count,
                    stats.failed_count + stats.success_count
                );
            }
        }

        Request::List { prefix } => {
            let objects = transfer.list(prefix)?;
            if common.json {
                output::print_json(&objects)?;
            } else {
                output::object_list(store.container(), &objects);
            }
        }

        Request::Download { key, local_path } => {
            let size = transfer.download(key, local_path)?;
            if common.json {
                output::print_json(&json!({
                    "remote_key": key,
                    "local_path": local_path,
                    "size": size,
                }))?;
            } else {
                output::downloaded(key, local_path, size);
            }
        }
    }

    Ok(())
}
