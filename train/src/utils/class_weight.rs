use crate::common::*;

#[derive(Debug, Deserialize)]
struct WeightRow {
    class_id: usize,
    weight: f32,
}

/// Per-class loss weights. Starts from all ones, optionally scaled by a
/// csv file with `class_id,weight` rows; the background class (last index)
/// is silenced unless `add_bg_loss` is set.
pub fn class_weight_from_file(
    n_class: usize,
    weight_file: Option<&Path>,
    add_bg_loss: bool,
) -> Result<Tensor> {
    let mut weights = vec![1.0f32; n_class];

    if let Some(path) = weight_file {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("failed to open loss weight file '{}'", path.display()))?;
        let mut rows: Vec<WeightRow> = reader
            .deserialize()
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("malformed loss weight file '{}'", path.display()))?;
        rows.sort_by_key(|row| row.class_id);

        ensure!(
            rows.len() == n_class,
            "loss weight file '{}' lists {} classes, expected {}",
            path.display(),
            rows.len(),
            n_class
        );
        for (weight, row) in weights.iter_mut().zip(rows) {
            *weight *= row.weight;
        }
    }

    if !add_bg_loss {
        weights[n_class - 1] = 0.0;
    }

    Ok(Tensor::of_slice(&weights))
}
