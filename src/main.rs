use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mocap_slicer::config::Config;
use mocap_slicer::pipeline;
use mocap_slicer::slicing::OffsetTable;
use mocap_slicer::video::OpenCvBackend;

const CONFIG_PATH: &str = "mocap_slicer.toml";

#[derive(Parser, Debug)]
#[command(name = "mocap-slicer")]
#[command(about = "Extract 24-joint keypoints from mocap markers, slice repetitions and render previews")]
#[command(version)]
struct Args {
    /// 設定ファイル
    #[arg(short, long, default_value = CONFIG_PATH, env = "MOCAP_SLICER_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 生動画と生マーカー CSV がそろっているか確認
    Check,
    /// マーカー CSV から 24 関節テーブルを作る
    Extract,
    /// 反復ごとに関節テーブルと動画を切り出す
    Slice,
    /// 切り出したクリップに関節を重ねたプレビューを作る
    Preview,
    /// check → extract → slice → preview
    Run,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    info!("mocap-slicer ({})", env!("GIT_VERSION"));

    let config = Config::load(&args.config)?;
    let backend = OpenCvBackend::new(&config.video.fourcc);

    match args.command {
        Command::Check => {
            let offsets = OffsetTable::load(&config.paths.offset_table)?;
            let missing = pipeline::check_inputs(&config.paths, &offsets);
            if !missing.is_empty() {
                bail!("{} input files are missing", missing.len());
            }
        }
        Command::Extract => {
            let offsets = OffsetTable::load(&config.paths.offset_table)?;
            pipeline::extract_all(&config, &offsets, &backend);
        }
        Command::Slice => {
            let offsets = OffsetTable::load(&config.paths.offset_table)?;
            pipeline::slice_all(&config, &offsets, &backend);
        }
        Command::Preview => {
            pipeline::preview_all(&config, &backend)?;
        }
        Command::Run => {
            pipeline::run_all(&config, &backend)?;
        }
    }

    Ok(())
}
