use std::path::Path;
use std::process::Command;

use transcode_media::check_ffmpeg;
use transcode_worker::{load_presets, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = WorkerConfig::from_env()?;

    println!(
        "worker-selfcheck: starting with work_dir={} queue_url={}",
        config.work_dir, config.queue_url
    );
    ensure_workdir(&config.work_dir).await?;
    ensure_ffmpeg()?;

    let presets = load_presets(config.presets_file.as_deref())?;
    println!(
        "worker-selfcheck: presets {}",
        presets.names().collect::<Vec<_>>().join(", ")
    );

    println!("worker-selfcheck: ok");
    Ok(())
}

async fn ensure_workdir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;

    // The worker creates a scratch directory per job here.
    let probe = tempfile::tempdir_in(path)
        .map_err(|e| anyhow::anyhow!("work dir {} is not writable: {}", path.display(), e))?;
    drop(probe);
    Ok(())
}

fn ensure_ffmpeg() -> anyhow::Result<()> {
    let ffmpeg = check_ffmpeg()?;
    let output = Command::new(&ffmpeg)
        .arg("-version")
        .output()
        .map_err(|e| anyhow::anyhow!("ffmpeg at {} not runnable: {}", ffmpeg.display(), e))?;

    if !output.status.success() {
        return Err(anyhow::anyhow!(
            "{} -version failed: {:?}",
            ffmpeg.display(),
            output.status
        ));
    }
    println!("worker-selfcheck: ffmpeg {}", ffmpeg.display());
    Ok(())
}
