use crate::{common::*, config::Config};

const MANIFEST_SUFFIX: &str = ".ckpt.json";
const ENCODER_SUFFIX: &str = ".enc.ckpt";
const DECODER_SUFFIX: &str = ".dec.ckpt";

/// The json side of a checkpoint. The two weight blobs live next to it as
/// `<stem>.enc.ckpt` and `<stem>.dec.ckpt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointManifest {
    pub epoch: usize,
    pub config: Config,
}

/// The resolved file set of one checkpoint.
#[derive(Debug, Clone)]
pub struct CheckpointFiles {
    pub manifest: PathBuf,
    pub encoder: PathBuf,
    pub decoder: PathBuf,
}

impl CheckpointFiles {
    /// The files of checkpoint `<model_name>-<epoch>` under a directory.
    pub fn for_epoch(pth_dir: &Path, model_name: &str, epoch: usize) -> Self {
        let stem = format!("{}-{}", model_name, epoch);
        Self {
            manifest: pth_dir.join(format!("{}{}", stem, MANIFEST_SUFFIX)),
            encoder: pth_dir.join(format!("{}{}", stem, ENCODER_SUFFIX)),
            decoder: pth_dir.join(format!("{}{}", stem, DECODER_SUFFIX)),
        }
    }

    /// Derives the weight file paths from a manifest path.
    pub fn from_manifest_path(manifest: &Path) -> Result<Self> {
        let name = manifest
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| format_err!("invalid checkpoint path '{}'", manifest.display()))?;
        let stem = name.strip_suffix(MANIFEST_SUFFIX).ok_or_else(|| {
            format_err!(
                "checkpoint manifest '{}' does not end with '{}'",
                manifest.display(),
                MANIFEST_SUFFIX
            )
        })?;
        let dir = manifest.parent().unwrap_or_else(|| Path::new(""));

        Ok(Self {
            manifest: manifest.to_owned(),
            encoder: dir.join(format!("{}{}", stem, ENCODER_SUFFIX)),
            decoder: dir.join(format!("{}{}", stem, DECODER_SUFFIX)),
        })
    }
}

/// Loads a checkpoint manifest for resuming. Fails if the path does not
/// exist; this runs before any model construction.
pub fn load_manifest(path: &Path) -> Result<CheckpointManifest> {
    ensure!(path.exists(), "'{}' does not exist!", path.display());
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read checkpoint manifest '{}'", path.display()))?;
    let manifest = serde_json::from_str(&text)
        .with_context(|| format!("malformed checkpoint manifest '{}'", path.display()))?;
    Ok(manifest)
}

/// Saves the per-epoch checkpoint: manifest plus encoder/decoder weights.
pub fn save_checkpoint(
    pth_dir: &Path,
    model_name: &str,
    epoch: usize,
    config: &Config,
    vs_enc: &nn::VarStore,
    vs_dec: &nn::VarStore,
) -> Result<CheckpointFiles> {
    let files = CheckpointFiles::for_epoch(pth_dir, model_name, epoch);

    let manifest = CheckpointManifest {
        epoch,
        config: config.clone(),
    };
    fs::write(&files.manifest, serde_json::to_string_pretty(&manifest)?)?;
    vs_enc.save(&files.encoder)?;
    vs_dec.save(&files.decoder)?;

    Ok(files)
}

/// Writes the resolved run parameters once at startup. Refuses to touch an
/// existing file to keep the record of a prior run intact.
pub fn save_param_file(path: &Path, config: &Config) -> Result<()> {
    ensure!(
        !path.exists(),
        "parameter file '{}' already exists, not overwriting a prior run",
        path.display()
    );
    fs::write(path, serde_json::to_string_pretty(config)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_resume_path_fails() -> Result<()> {
        let missing = Path::new("/nonexistent/run/MCD-run1-drn-3.ckpt.json");
        ensure!(
            load_manifest(missing).is_err(),
            "missing resume path must fail"
        );
        Ok(())
    }

    #[test]
    fn weight_paths_derive_from_manifest() -> Result<()> {
        let files =
            CheckpointFiles::from_manifest_path(Path::new("out/pth/MCD-run1-drn-3.ckpt.json"))?;
        ensure!(files.encoder == Path::new("out/pth/MCD-run1-drn-3.enc.ckpt"));
        ensure!(files.decoder == Path::new("out/pth/MCD-run1-drn-3.dec.ckpt"));

        ensure!(
            CheckpointFiles::from_manifest_path(Path::new("out/pth/weights.bin")).is_err(),
            "non-manifest paths must be rejected"
        );
        Ok(())
    }

    #[test]
    fn epoch_files_round_trip() -> Result<()> {
        let files = CheckpointFiles::for_epoch(Path::new("out/pth"), "MCD-run1-drn", 7);
        let derived = CheckpointFiles::from_manifest_path(&files.manifest)?;
        ensure!(files.encoder == derived.encoder);
        ensure!(files.decoder == derived.decoder);
        Ok(())
    }

    #[test]
    fn param_file_collision_fails_without_overwrite() -> Result<()> {
        let dir = std::env::temp_dir().join(format!("mcd-param-test-{}", std::process::id()));
        fs::create_dir_all(&dir)?;
        let path = dir.join("param-MCD-run1-drn.json");

        fs::write(&path, "original")?;
        let config_text = fs::read_to_string(&path)?;

        let config = crate::config::testing::example_config();

        ensure!(
            save_param_file(&path, &config).is_err(),
            "existing parameter file must abort the run"
        );
        ensure!(
            fs::read_to_string(&path)? == config_text,
            "existing parameter file must not be overwritten"
        );

        fs::remove_dir_all(&dir)?;
        Ok(())
    }
}
