//! Image cleanup for OCR.
//!
//! Pipeline order: grayscale → deskew → denoise → contrast → binarize → invert.
//! Deskew uses a projection-profile search: the rotation that makes
//! horizontal row sums of dark pixels most peaked aligns the text lines.

use crate::preprocessing::{PreprocessingMetadata, PreprocessingOutput};
use crate::types::ImagePreprocessingConfig;
use crate::{DoccraftError, Result};
use image::imageops::FilterType;
use image::{GrayImage, Luma};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use std::path::{Path, PathBuf};

const DESKEW_STEP_DEGREES: f32 = 0.5;
const DESKEW_WORKING_SIZE: u32 = 600;
const MIN_CORRECTION_DEGREES: f32 = 0.25;

#[derive(Debug, Clone, Default)]
pub struct ImagePreprocessor {
    config: ImagePreprocessingConfig,
}

impl ImagePreprocessor {
    pub fn new(config: ImagePreprocessingConfig) -> Self {
        Self { config }
    }

    /// Process `path` and write `<stem>_preprocessed.png`.
    pub async fn process(&self, path: &Path) -> Result<PreprocessingOutput> {
        let config = self.config.clone();
        let owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || process_sync(&owned, &config))
            .await
            .map_err(|e| DoccraftError::Other(format!("Image preprocessing task panicked: {}", e)))?
    }
}

fn output_path(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    dir.join(format!("{}_preprocessed.png", stem))
}

fn process_sync(path: &Path, config: &ImagePreprocessingConfig) -> Result<PreprocessingOutput> {
    let image = image::open(path)?;
    let mut metadata = PreprocessingMetadata {
        original_width: Some(image.width()),
        original_height: Some(image.height()),
        ..Default::default()
    };

    let mut gray = image.to_luma8();
    metadata.operations.push("grayscale".to_string());

    if config.deskew {
        let angle = estimate_skew(&gray, config.max_skew_degrees);
        metadata.skew_angle = Some(angle);
        if angle.abs() >= MIN_CORRECTION_DEGREES {
            gray = rotate_about_center(&gray, angle.to_radians(), Interpolation::Bilinear, Luma([255u8]));
        }
        metadata.operations.push("deskew".to_string());
    }

    if config.denoise {
        gray = imageproc::filter::median_filter(&gray, 1, 1);
        metadata.operations.push("denoise".to_string());
    }

    if config.contrast_enhance {
        gray = imageproc::contrast::equalize_histogram(&gray);
        metadata.operations.push("contrast".to_string());
    }

    if config.binarize {
        binarize_otsu(&mut gray);
        metadata.operations.push("binarize".to_string());
    }

    if config.invert_colors {
        image::imageops::invert(&mut gray);
        metadata.operations.push("invert".to_string());
    }

    let out = output_path(path, config.output_dir.as_deref());
    if let Some(parent) = out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    gray.save(&out)?;
    metadata.enhancement_applied = true;

    tracing::debug!(
        "Preprocessed {} -> {} ({})",
        path.display(),
        out.display(),
        metadata.operations.join(", ")
    );

    Ok(PreprocessingOutput { path: out, metadata })
}

/// Threshold at Otsu's level: background white, ink black.
fn binarize_otsu(gray: &mut GrayImage) {
    let level = imageproc::contrast::otsu_level(gray);
    for pixel in gray.pixels_mut() {
        pixel.0[0] = if pixel.0[0] > level { 255 } else { 0 };
    }
}

/// Rotation in degrees that best aligns text lines horizontally.
pub fn estimate_skew(gray: &GrayImage, max_degrees: f32) -> f32 {
    if max_degrees <= 0.0 || gray.width() < 8 || gray.height() < 8 {
        return 0.0;
    }

    let scale = (DESKEW_WORKING_SIZE as f32 / gray.width().max(gray.height()) as f32).min(1.0);
    let width = ((gray.width() as f32 * scale) as u32).max(1);
    let height = ((gray.height() as f32 * scale) as u32).max(1);
    let mut small = image::imageops::resize(gray, width, height, FilterType::Triangle);
    binarize_otsu(&mut small);

    let steps = (max_degrees / DESKEW_STEP_DEGREES).floor() as i32;
    let mut best_angle = 0.0f32;
    let mut best_score = profile_score(&small);

    for step in -steps..=steps {
        if step == 0 {
            continue;
        }
        let angle = step as f32 * DESKEW_STEP_DEGREES;
        let rotated = rotate_about_center(&small, angle.to_radians(), Interpolation::Nearest, Luma([255u8]));
        let score = profile_score(&rotated);
        if score > best_score {
            best_score = score;
            best_angle = angle;
        }
    }

    best_angle
}

/// Sum of squared differences between adjacent row ink counts.
fn profile_score(binary: &GrayImage) -> f64 {
    let rows: Vec<f64> = binary
        .rows()
        .map(|row| row.filter(|pixel| pixel.0[0] < 128).count() as f64)
        .collect();
    rows.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum()
}
