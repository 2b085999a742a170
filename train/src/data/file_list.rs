use super::*;
use crate::{common::*, config::DomainConfig};

/// A dataset addressed by a split file of sample ids. Sample `<id>` maps to
/// `rgb/<id>.png`, `depth/<id>.png` and (source domain only)
/// `label/<id>.png` under the dataset directory.
#[derive(Debug)]
pub struct FileListDataset {
    dataset_dir: PathBuf,
    ids: Vec<String>,
    input_ch: usize,
    image_shape: (usize, usize),
    with_labels: bool,
}

impl FileListDataset {
    pub fn open(
        domain: &DomainConfig,
        input_ch: usize,
        image_shape: (usize, usize),
        with_labels: bool,
    ) -> Result<Self> {
        let split_file = domain.dataset_dir.join(format!("{}.txt", domain.split));
        let text = fs::read_to_string(&split_file)
            .with_context(|| format!("failed to read split file '{}'", split_file.display()))?;
        let ids: Vec<_> = text
            .lines()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .map(|line| line.to_owned())
            .collect();
        ensure!(
            !ids.is_empty(),
            "split file '{}' lists no samples",
            split_file.display()
        );

        Ok(Self {
            dataset_dir: domain.dataset_dir.clone(),
            ids,
            input_ch,
            image_shape,
            with_labels,
        })
    }

    /// Loads the `[input_ch, h, w]` float image of the nth sample.
    fn load_image(&self, index: usize) -> Result<Tensor> {
        let id = &self.ids[index];
        let (height, width) = self.image_shape;

        let rgb_path = self.dataset_dir.join("rgb").join(format!("{}.png", id));
        let rgb = load_resized(&rgb_path, width, height)?;
        ensure!(
            rgb.size3()?.0 == 3,
            "expect a 3-channel image at '{}'",
            rgb_path.display()
        );

        let depth_ch = (self.input_ch - 3) as i64;
        let depth_path = self.dataset_dir.join("depth").join(format!("{}.png", id));
        let depth = load_resized(&depth_path, width, height)?.narrow(0, 0, depth_ch);

        let image = Tensor::cat(&[rgb, depth], 0).to_kind(Kind::Float) / 255.0;
        Ok(image)
    }

    fn load_label(&self, index: usize) -> Result<Tensor> {
        let id = &self.ids[index];
        let (height, width) = self.image_shape;

        let label_path = self.dataset_dir.join("label").join(format!("{}.png", id));
        let label = load_resized(&label_path, width, height)?
            .narrow(0, 0, 1)
            .reshape(&[height as i64, width as i64])
            .to_kind(Kind::Int64);
        Ok(label)
    }
}

fn load_resized(path: &Path, width: usize, height: usize) -> Result<Tensor> {
    let image = vision::image::load(path)
        .with_context(|| format!("failed to load image '{}'", path.display()))?;
    let image = vision::image::resize(&image, width as i64, height as i64)?;
    Ok(image)
}

impl GenericDataset for FileListDataset {
    fn num_records(&self) -> usize {
        self.ids.len()
    }
}

impl SourceDataset for FileListDataset {
    fn nth(&self, index: usize) -> Result<SourceRecord> {
        ensure!(
            self.with_labels,
            "dataset opened without labels cannot serve source records"
        );
        Ok(SourceRecord {
            image: self.load_image(index)?,
            label: self.load_label(index)?,
        })
    }
}

impl TargetDataset for FileListDataset {
    fn nth(&self, index: usize) -> Result<TargetRecord> {
        Ok(TargetRecord {
            image: self.load_image(index)?,
        })
    }
}
