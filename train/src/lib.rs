//! The MCD multitask domain-adaptation training program.

pub mod common;
pub mod config;
pub mod data;
pub mod logging;
pub mod model;
pub mod train;
pub mod utils;

use crate::common::*;
use crate::utils::CheckpointFiles;

/// The entry of training program.
pub async fn start(config: config::Config, resume: Option<PathBuf>) -> Result<()> {
    // resolve the resume request before anything else; a missing path is
    // fatal and no model may be constructed first
    let (config, resume_files, start_epoch, resume_flag) = match resume {
        Some(path) => {
            info!("loading checkpoint '{}'", path.display());
            let manifest = utils::load_manifest(&path)?;
            let files = CheckpointFiles::from_manifest_path(&path)?;
            let start_epoch = manifest.epoch;
            // the stored configuration replaces the live one wholesale,
            // except the requested total epoch count
            let config = config.merge_resumed(manifest.config);
            (config, Some(files), start_epoch, true)
        }
        None => (config, None, 0, false),
    };

    config.validate()?;

    let config = Arc::new(config);
    let mode_name = config.mode_name();
    let model_name = config.model_name();
    let outdir = config.logging.base_outdir.join(&mode_name);
    let pth_dir = Arc::new(outdir.join("pth"));
    let tflog_dir = Arc::new(outdir.join("tflog").join(&model_name));

    // create dirs and save the run parameter record
    {
        tokio::fs::create_dir_all(&*pth_dir).await?;
        tokio::fs::create_dir_all(&*tflog_dir).await?;

        let param_name = if resume_flag {
            format!("param-{}_resume.json", model_name)
        } else {
            format!("param-{}.json", model_name)
        };
        utils::save_param_file(&outdir.join(param_name), &config)?;
    }

    let (logging_tx, logging_rx) = broadcast::channel(2);

    let logging_future = logging::logging_worker(tflog_dir, logging_rx);

    let training_future = {
        let config = config.clone();
        let pth_dir = pth_dir.clone();
        tokio::task::spawn_blocking(move || {
            train::training_worker(config, resume_files, start_epoch, pth_dir, logging_tx)
        })
        .map(|result| Fallible::Ok(result??))
    };

    futures::try_join!(training_future, logging_future)?;

    Ok(())
}
