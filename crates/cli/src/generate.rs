//! Dataset generation command.

use anyhow::Context;
use dbcompare_core::{BenchConfig, RowGenerator};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

fn progress_bar(rows: u64, size: &str) -> ProgressBar {
    let bar = ProgressBar::new(rows);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} rows {msg}")
    {
        bar.set_style(style.progress_chars("=>-"));
    }
    bar.set_message(size.to_string());
    bar
}

/// Write the dataset for `size` to its configured file path.
///
/// Returns the path written.
pub fn generate_size(config: &BenchConfig, size: &str) -> anyhow::Result<PathBuf> {
    let dataset = config.data.size(size)?;
    let bar = progress_bar(dataset.rows, size);

    let mut generator = RowGenerator::new(config.data.columns.clone(), config.benchmarks.seed);
    generator
        .write_dataset(dataset.rows, &dataset.file_path, |written| bar.inc(written))
        .with_context(|| format!("generating {size} dataset"))?;

    bar.finish_with_message(format!("{size} -> {}", dataset.file_path.display()));
    Ok(dataset.file_path.clone())
}
