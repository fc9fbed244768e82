use std::path::Path;

use anyhow::Result;
use colored::*;
use hakobu_core::utils::format_size;
use hakobu_core::{ContainerStatus, RemoteObject, TransferStats, TransferredFile};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

/// JSON で標準出力に表示
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn container_status(store_name: &str, container: &str, status: ContainerStatus) {
    match status {
        ContainerStatus::Existing => println!(
            "{} {} / {}",
            "☁".cyan(),
            store_name.dimmed(),
            container.bright_blue()
        ),
        ContainerStatus::Created => println!(
            "{} {} / {} {}",
            "☁".cyan(),
            store_name.dimmed(),
            container.bright_blue(),
            "(新規作成)".green()
        ),
    }
}

pub fn uploaded_file(file: &TransferredFile) {
    println!(
        "{} {} -> {} ({})",
        "✅".green(),
        file.local_path.display().to_string().bright_blue(),
        file.remote_key.yellow(),
        format_size(file.size).yellow()
    );
}

/// ディレクトリアップロード用のプログレスバー
pub fn upload_progress(total: usize, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }

    println!(
        "{} {} 件のファイルをアップロード中...",
        "📤".cyan(),
        total.to_string().yellow().bold()
    );

    let pb = ProgressBar::new(total as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

pub fn upload_summary(stats: &TransferStats, failed: &[(String, String)]) {
    if !failed.is_empty() {
        println!("\n{} 失敗したファイル:", "❌".red());
        for (path, reason) in failed {
            println!("  - {} {}", path.bright_blue(), reason.dimmed());
        }
    }

    let elapsed = stats.finished_at - stats.started_at;
    let icon = if stats.is_success() { "✅".green() } else { "⚠".yellow() };

    println!(
        "\n{} アップロード完了: {} 件成功, {} 件失敗 (合計: {}, {:.1} 秒)",
        icon,
        stats.success_count.to_string().green().bold(),
        stats.failed_count.to_string().red().bold(),
        stats.formatted_size().yellow().bold(),
        elapsed.num_milliseconds() as f64 / 1000.0
    );
}

pub fn object_list(container: &str, objects: &[RemoteObject]) {
    if objects.is_empty() {
        println!("{}", "✨ オブジェクトが見つかりませんでした".green());
        return;
    }

    let total_size: u64 = objects.iter().map(|o| o.size).sum();
    println!(
        "\n{} に {} 件のオブジェクト (合計: {})\n",
        container.bright_blue(),
        objects.len().to_string().yellow().bold(),
        format_size(total_size).yellow().bold()
    );

    for (i, object) in objects.iter().enumerate() {
        println!(
            "  {}. {} - {}",
            (i + 1).to_string().dimmed(),
            object.key.bright_blue(),
            format_size(object.size).yellow()
        );
    }
}

pub fn downloaded(key: &str, local_path: &Path, size: u64) {
    println!(
        "{} {} -> {} ({})",
        "✅".green(),
        key.yellow(),
        local_path.display().to_string().bright_blue(),
        format_size(size).yellow()
    );
}
