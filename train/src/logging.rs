//! Data logging toolkit.

use crate::common::*;

/// Per-epoch scalars, consumed by the logging worker.
#[derive(Debug, Clone, Copy)]
pub struct EpochLog {
    pub epoch: usize,
    pub c_loss: f64,
    pub d_loss: f64,
    pub src_semseg_loss: f64,
    pub src_depth_loss: f64,
    pub tgt_depth_loss: f64,
    pub lr: f64,
    pub std_semseg: f64,
    pub std_depth: f64,
}

/// Writes the per-epoch scalar series as TensorBoard event files under the
/// run's tflog directory.
pub async fn logging_worker(
    tflog_dir: Arc<PathBuf>,
    mut rx: broadcast::Receiver<EpochLog>,
) -> Result<()> {
    tokio::fs::create_dir_all(&*tflog_dir).await?;
    let event_path_prefix = tflog_dir
        .join("events")
        .into_os_string()
        .into_string()
        .map_err(|_| format_err!("invalid tflog directory"))?;

    let mut event_writer = EventWriterInit::default()
        .from_prefix_async(event_path_prefix, None)
        .await?;

    loop {
        let log = match rx.recv().await {
            Ok(log) => log,
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        };
        let EpochLog {
            epoch,
            c_loss,
            d_loss,
            src_semseg_loss,
            src_depth_loss,
            tgt_depth_loss,
            lr,
            std_semseg,
            std_depth,
        } = log;
        let step = epoch as i64;

        event_writer
            .write_scalar_async("c_loss", step, c_loss as f32)
            .await?;
        event_writer
            .write_scalar_async("d_loss", step, d_loss as f32)
            .await?;
        event_writer
            .write_scalar_async("src_semseg_loss", step, src_semseg_loss as f32)
            .await?;
        event_writer
            .write_scalar_async("src_depth_loss", step, src_depth_loss as f32)
            .await?;
        event_writer
            .write_scalar_async("tgt_depth_loss", step, tgt_depth_loss as f32)
            .await?;
        event_writer
            .write_scalar_async("lr", step, lr as f32)
            .await?;
        event_writer
            .write_scalar_async("std_semseg", step, std_semseg as f32)
            .await?;
        event_writer
            .write_scalar_async("std_depth", step, std_depth as f32)
            .await?;

        info!("logged scalars for epoch {}", epoch);
    }

    Ok(())
}
