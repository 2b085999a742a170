use crate::{
    common::*,
    config::{OptimizerKind, TrainingConfig},
};

/// Uniform front over the optimizer variants selectable from the
/// configuration.
pub enum AnyOptimizer {
    Sgd(nn::Optimizer),
    Adam(nn::Optimizer),
}

impl AnyOptimizer {
    /// Builds the configured optimizer over all variables of a var store.
    pub fn build(vs: &nn::VarStore, config: &TrainingConfig) -> Result<Self> {
        let TrainingConfig {
            opt,
            lr,
            momentum,
            weight_decay,
            ..
        } = *config;

        let optimizer = match opt {
            OptimizerKind::Sgd => {
                let sgd = nn::Sgd {
                    momentum: momentum.raw(),
                    wd: weight_decay.raw(),
                    ..Default::default()
                };
                Self::Sgd(sgd.build(vs, lr.raw())?)
            }
            OptimizerKind::Adam => {
                let adam = nn::Adam {
                    beta1: momentum.raw(),
                    beta2: 0.999,
                    wd: weight_decay.raw(),
                };
                Self::Adam(adam.build(vs, lr.raw())?)
            }
        };
        Ok(optimizer)
    }

    pub fn zero_grad(&mut self) {
        match self {
            Self::Sgd(opt) => opt.zero_grad(),
            Self::Adam(opt) => opt.zero_grad(),
        }
    }

    pub fn step(&mut self) {
        match self {
            Self::Sgd(opt) => opt.step(),
            Self::Adam(opt) => opt.step(),
        }
    }

    pub fn set_lr(&mut self, lr: f64) {
        match self {
            Self::Sgd(opt) => opt.set_lr(lr),
            Self::Adam(opt) => opt.set_lr(lr),
        }
    }
}
