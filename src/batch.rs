use anyhow::{bail, Context};
use image::DynamicImage;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::circle::{write_record, Circle};
use crate::config::AnnotatorConfig;

const RECORD_EXTENSION: &str = "txt";

// ── Jobs ────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Job {
    pub image_path: PathBuf,
    pub record_path: PathBuf,
}

/// Sidecar record for `image_path`: same file stem, `.txt`, inside `output_dir`.
pub fn record_path(image_path: &Path, output_dir: &Path) -> PathBuf {
    let file_name = image_path.file_name().unwrap_or_default();
    output_dir
        .join(file_name)
        .with_extension(RECORD_EXTENSION)
}

/// An image ready for annotation.
pub struct PendingImage {
    pub job: Job,
    pub image: DynamicImage,
    /// One-based position within the planned batch.
    pub position: usize,
    pub total: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub annotated: usize,
    pub skipped: usize,
    pub aborted: bool,
}

// ── Batch ───────────────────────────────────────────────────────────────────

pub struct Batch {
    jobs: Vec<Job>,
    cursor: usize,
    summary: BatchSummary,
}

impl Batch {
    pub fn plan(
        input_dir: &Path,
        output_dir: &Path,
        config: &AnnotatorConfig,
    ) -> anyhow::Result<Self> {
        if !output_dir.is_dir() {
            bail!("output directory {} does not exist", output_dir.display());
        }

        let entries = std::fs::read_dir(input_dir)
            .with_context(|| format!("failed to read input directory {}", input_dir.display()))?;
        let mut images = Vec::new();
        for entry in entries {
            let path = entry
                .with_context(|| format!("failed to list {}", input_dir.display()))?
                .path();
            if !path.is_file() {
                continue;
            }
            if image::ImageFormat::from_path(&path).is_err() {
                log::debug!("ignoring non-image file {}", path.display());
                continue;
            }
            images.push(path);
        }

        images.sort();
        if config.shuffle {
            let mut rng = match config.shuffle_seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            images.shuffle(&mut rng);
        }

        let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();
        let mut jobs = Vec::with_capacity(images.len());
        for image_path in images {
            let record_path = record_path(&image_path, output_dir);
            if let Some(other) = claimed.insert(record_path.clone(), image_path.clone()) {
                bail!(
                    "{} and {} would both be recorded in {}",
                    other.display(),
                    image_path.display(),
                    record_path.display()
                );
            }
            jobs.push(Job {
                image_path,
                record_path,
            });
        }

        log::info!(
            "planned {} images from {} into {}",
            jobs.len(),
            input_dir.display(),
            output_dir.display()
        );
        Ok(Self {
            jobs,
            cursor: 0,
            summary: BatchSummary::default(),
        })
    }

    pub fn summary(&self) -> BatchSummary {
        self.summary
    }

    /// Next image without a record, decoded. Images whose record already
    /// exists are skipped without being opened.
    pub fn next_image(&mut self) -> anyhow::Result<Option<PendingImage>> {
        if self.summary.aborted {
            return Ok(None);
        }
        while let Some(job) = self.jobs.get(self.cursor).cloned() {
            self.cursor += 1;
            if job.record_path.exists() {
                log::debug!("skipping {}: record exists", job.image_path.display());
                self.summary.skipped += 1;
                continue;
            }
            log::info!("annotating {}", job.image_path.display());
            let image = image::open(&job.image_path)
                .with_context(|| format!("failed to load image {}", job.image_path.display()))?;
            return Ok(Some(PendingImage {
                job,
                image,
                position: self.cursor,
                total: self.jobs.len(),
            }));
        }
        Ok(None)
    }

    pub fn finish(&mut self, pending: &PendingImage, circles: &[Circle]) -> anyhow::Result<()> {
        write_record(&pending.job.record_path, circles)?;
        self.summary.annotated += 1;
        log::info!(
            "wrote {} circles to {}",
            circles.len(),
            pending.job.record_path.display()
        );
        Ok(())
    }

    /// Stop the batch; nothing further is yielded.
    pub fn abort(&mut self) {
        self.summary.aborted = true;
        self.cursor = self.jobs.len();
    }
}
