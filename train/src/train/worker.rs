use super::phase::{self, BatchViews, DecoderAdversarialLosses, JointLosses};
use crate::{
    common::*,
    config::Config,
    data::{self, Batch},
    logging::EpochLog,
    model,
    utils::{self, AnyOptimizer, CheckpointFiles},
};

/// Scalar loss sums over one epoch. Source task losses accumulate from
/// both phase 1 and phase 2, as both phases recompute them.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct EpochAccum {
    pub c_loss: f64,
    pub d_loss: f64,
    pub src_semseg_loss: f64,
    pub src_depth_loss: f64,
    pub tgt_depth_loss: f64,
}

impl EpochAccum {
    fn add_joint(&mut self, losses: &JointLosses) {
        self.c_loss += losses.c_loss;
        self.src_semseg_loss += losses.src_semseg_loss;
        self.src_depth_loss += losses.src_depth_loss;
        self.tgt_depth_loss += losses.tgt_depth_loss;
    }

    fn add_decoder_adversarial(&mut self, losses: &DecoderAdversarialLosses) {
        self.src_semseg_loss += losses.src_semseg_loss;
        self.src_depth_loss += losses.src_depth_loss;
        self.tgt_depth_loss += losses.tgt_depth_loss;
    }
}

/// Per-epoch control counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct EpochStats {
    pub batches: usize,
    pub joint_updates: usize,
    pub decoder_updates: usize,
    pub encoder_inner_updates: usize,
}

/// Everything the per-batch loop mutates.
pub struct TrainContext {
    pub encoder: Encoder,
    pub decoder: MultitaskDecoder,
    pub opt_enc: AnyOptimizer,
    pub opt_dec: AnyOptimizer,
    pub device: Device,
    pub num_k: usize,
    pub d_loss_scale: f64,
    pub max_iter: usize,
}

/// Runs the three-phase loop over one epoch of batches.
pub fn train_epoch(
    ctx: &mut TrainContext,
    epoch: usize,
    batches: impl Iterator<Item = Result<Batch>>,
) -> Result<(EpochAccum, EpochStats)> {
    let mut accum = EpochAccum::default();
    let mut stats = EpochStats::default();

    for (ind, batch) in batches.enumerate() {
        let batch = batch?.to_device(ctx.device);
        let views = BatchViews::new(&batch);

        let joint = phase::joint_update(
            &ctx.encoder,
            &ctx.decoder,
            &mut ctx.opt_enc,
            &mut ctx.opt_dec,
            &views,
        );
        accum.add_joint(&joint);
        stats.joint_updates += 1;

        let decoder_adv = phase::decoder_adversarial_update(
            &ctx.encoder,
            &ctx.decoder,
            &mut ctx.opt_enc,
            &mut ctx.opt_dec,
            &views,
        );
        accum.add_decoder_adversarial(&decoder_adv);
        stats.decoder_updates += 1;

        let last_inner_loss = phase::encoder_adversarial_update(
            &ctx.encoder,
            &ctx.decoder,
            &mut ctx.opt_enc,
            &views,
            ctx.num_k,
            ctx.d_loss_scale,
        );
        stats.encoder_inner_updates += ctx.num_k;

        // the logged d_loss is the LAST inner-step loss divided by num_k,
        // not an average over the inner steps
        let d_loss = last_inner_loss / ctx.num_k as f64;
        accum.d_loss += d_loss;

        stats.batches += 1;

        if ind % 100 == 0 {
            info!(
                "epoch [{}] iter [{}] DLoss: {:.6} CLoss: {:.4}",
                epoch, ind, d_loss, joint.c_loss
            );
        }

        // hard truncation, not an error
        if ind >= ctx.max_iter {
            break;
        }
    }

    Ok((accum, stats))
}

/// The single-device training worker: builds models, optimizers and the
/// data pipeline, then runs the epoch loop to completion.
pub fn training_worker(
    config: Arc<Config>,
    resume: Option<CheckpointFiles>,
    start_epoch: usize,
    pth_dir: Arc<PathBuf>,
    logging_tx: broadcast::Sender<EpochLog>,
) -> Result<()> {
    let device = config.training.device;
    info!("use device {:?}", device);

    let class_weight = utils::class_weight_from_file(
        config.dataset.n_class,
        config.training.loss_weights_file.as_deref(),
        config.training.add_bg_loss,
    )?
    .to_device(device);

    info!("initializing models");
    let mut vs_enc = nn::VarStore::new(device);
    let mut vs_dec = nn::VarStore::new(device);
    let (encoder, decoder) =
        model::build_models(&vs_enc.root(), &vs_dec.root(), &config, class_weight);

    if let Some(files) = &resume {
        info!(
            "loading checkpoint weights '{}' / '{}'",
            files.encoder.display(),
            files.decoder.display()
        );
        vs_enc.load(&files.encoder)?;
        vs_dec.load(&files.decoder)?;
    }

    let opt_enc = AnyOptimizer::build(&vs_enc, &config.training)?;
    let opt_dec = AnyOptimizer::build(&vs_dec, &config.training)?;

    info!("loading datasets");
    let mut loader = data::load_paired_loader(&config)?;
    info!("{} records per epoch", loader.num_records());

    let mut ctx = TrainContext {
        encoder,
        decoder,
        opt_enc,
        opt_dec,
        device,
        num_k: config.training.num_k.get(),
        d_loss_scale: config.training.num_multiply_d_loss.raw(),
        max_iter: config.training.max_iter,
    };

    let model_name = config.model_name();
    // checkpoints store this copy; the decayed learning rate is written
    // back into it so a resumed run continues the schedule
    let mut run_config = (*config).clone();
    let mut lr = config.training.lr.raw();
    let weight_decay = config.training.weight_decay.raw();
    let epochs = config.training.epochs;

    for epoch in start_epoch..epochs {
        let (accum, _stats) = train_epoch(&mut ctx, epoch, loader.epoch(epoch))?;

        let (std_semseg, std_depth) = ctx.decoder.get_task_weights();
        info!("std_semseg: {:.4}, std_depth: {:.4}", std_semseg, std_depth);
        info!(
            "Epoch [{}] DLoss: {:.4} CLoss: {:.4}",
            epoch, accum.d_loss, accum.c_loss
        );
        info!(
            "SrcSemsegLoss: {:.4}, SrcDepthLoss: {:.4}, TgtDepthLoss: {:.4}",
            accum.src_semseg_loss, accum.src_depth_loss, accum.tgt_depth_loss
        );

        logging_tx
            .send(EpochLog {
                epoch,
                c_loss: accum.c_loss,
                d_loss: accum.d_loss,
                src_semseg_loss: accum.src_semseg_loss,
                src_depth_loss: accum.src_depth_loss,
                tgt_depth_loss: accum.tgt_depth_loss,
                lr,
                std_semseg,
                std_depth,
            })
            .map_err(|_| format_err!("cannot send message to logger"))?;

        if config.training.adjust_lr {
            lr = utils::adjust_learning_rate(&mut ctx.opt_enc, lr, weight_decay, epoch, epochs);
            lr = utils::adjust_learning_rate(&mut ctx.opt_dec, lr, weight_decay, epoch, epochs);
        }

        let files = save_epoch_checkpoint(
            &pth_dir,
            &model_name,
            epoch + 1,
            &mut run_config,
            lr,
            &vs_enc,
            &vs_dec,
        )?;
        info!("saved checkpoint '{}'", files.manifest.display());
    }

    Ok(())
}

/// Saves the per-epoch checkpoint with the learning rate currently in
/// effect. The rate goes into the stored config, so resuming rebuilds the
/// optimizers at the decayed rate instead of the base one.
fn save_epoch_checkpoint(
    pth_dir: &Path,
    model_name: &str,
    epoch: usize,
    config: &mut Config,
    lr: f64,
    vs_enc: &nn::VarStore,
    vs_dec: &nn::VarStore,
) -> Result<CheckpointFiles> {
    config.training.lr = r64(lr);
    utils::save_checkpoint(pth_dir, model_name, epoch, config, vs_enc, vs_dec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::testing::synthetic_loader,
        train::phase::testing::{fixture, Fixture},
    };

    fn context(num_k: usize, max_iter: usize) -> Result<TrainContext> {
        let Fixture {
            encoder,
            decoder,
            opt_enc,
            opt_dec,
            ..
        } = fixture()?;
        Ok(TrainContext {
            encoder,
            decoder,
            opt_enc,
            opt_dec,
            device: Device::Cpu,
            num_k,
            d_loss_scale: 1.0,
            max_iter,
        })
    }

    #[test]
    fn phase_call_counts_per_batch() -> Result<()> {
        let mut ctx = context(3, 100)?;
        let mut loader = synthetic_loader(4, 4, 2);

        let (accum, stats) = train_epoch(&mut ctx, 0, loader.epoch(0))?;
        ensure!(stats.batches == 2);
        ensure!(stats.joint_updates == stats.batches);
        ensure!(stats.decoder_updates == stats.batches);
        ensure!(stats.encoder_inner_updates == stats.batches * 3);
        ensure!(accum.c_loss > 0.0, "classification loss must accumulate");
        Ok(())
    }

    #[test]
    fn accumulators_sum_per_batch_contributions() -> Result<()> {
        let fresh = EpochAccum::default();
        ensure!(
            fresh.c_loss == 0.0
                && fresh.d_loss == 0.0
                && fresh.src_semseg_loss == 0.0
                && fresh.src_depth_loss == 0.0
                && fresh.tgt_depth_loss == 0.0,
            "a new accumulator must start from zero"
        );

        // dyadic values keep the float sums exact
        let joint_a = JointLosses {
            c_loss: 1.0,
            src_semseg_loss: 0.5,
            src_depth_loss: 0.25,
            tgt_depth_loss: 0.125,
        };
        let joint_b = JointLosses {
            c_loss: 2.0,
            src_semseg_loss: 0.75,
            src_depth_loss: 1.5,
            tgt_depth_loss: 0.375,
        };
        let adversarial = DecoderAdversarialLosses {
            src_semseg_loss: 0.25,
            src_depth_loss: 0.5,
            tgt_depth_loss: 1.0,
            discrepancy: 4.0,
        };

        let mut accum = EpochAccum::default();
        accum.add_joint(&joint_a);
        accum.add_decoder_adversarial(&adversarial);
        accum.add_joint(&joint_b);

        ensure!(accum.c_loss == joint_a.c_loss + joint_b.c_loss);
        ensure!(
            accum.src_semseg_loss
                == joint_a.src_semseg_loss
                    + adversarial.src_semseg_loss
                    + joint_b.src_semseg_loss,
            "source losses accumulate from both phases"
        );
        ensure!(
            accum.src_depth_loss
                == joint_a.src_depth_loss + adversarial.src_depth_loss + joint_b.src_depth_loss
        );
        ensure!(
            accum.tgt_depth_loss
                == joint_a.tgt_depth_loss + adversarial.tgt_depth_loss + joint_b.tgt_depth_loss
        );
        ensure!(
            accum.d_loss == 0.0,
            "the decoder-phase discrepancy must not enter d_loss"
        );
        Ok(())
    }

    #[test]
    fn iteration_cap_bounds_batches() -> Result<()> {
        let mut ctx = context(1, 2)?;
        let mut loader = synthetic_loader(10, 10, 1);

        let (_, stats) = train_epoch(&mut ctx, 0, loader.epoch(0))?;
        ensure!(
            stats.batches == 3,
            "cap of 2 must process exactly cap + 1 batches, got {}",
            stats.batches
        );
        Ok(())
    }

    #[test]
    fn checkpoint_stores_adjusted_learning_rate() -> Result<()> {
        let dir = std::env::temp_dir().join(format!("mcd-ckpt-lr-test-{}", std::process::id()));
        fs::create_dir_all(&dir)?;

        let mut config = crate::config::testing::example_config();
        let base_lr = config.training.lr.raw();
        let weight_decay = config.training.weight_decay.raw();
        let epochs = config.training.epochs;

        let vs_enc = nn::VarStore::new(Device::Cpu);
        let vs_dec = nn::VarStore::new(Device::Cpu);
        let _w_enc = vs_enc.root().zeros("w", &[1]);
        let _w_dec = vs_dec.root().zeros("w", &[1]);
        let mut opt_enc = AnyOptimizer::build(&vs_enc, &config.training)?;
        let mut opt_dec = AnyOptimizer::build(&vs_dec, &config.training)?;

        let mut lr = base_lr;
        lr = utils::adjust_learning_rate(&mut opt_enc, lr, weight_decay, 1, epochs);
        lr = utils::adjust_learning_rate(&mut opt_dec, lr, weight_decay, 1, epochs);
        ensure!(lr < base_lr);

        let files =
            save_epoch_checkpoint(&dir, "MCD-run1-drn", 2, &mut config, lr, &vs_enc, &vs_dec)?;
        let manifest = utils::load_manifest(&files.manifest)?;
        ensure!(
            manifest.config.training.lr.raw() == lr,
            "a resumed run must continue from the decayed learning rate"
        );

        fs::remove_dir_all(&dir)?;
        Ok(())
    }
}
