// upload.rs - file upload adapter: paths (files or directories) → image records
use futures_util::future::join_all;
use image::ImageFormat;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::image_record::{NewImage, SourceKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UploadReport {
    /// Files looked at (after directory expansion)
    pub processed: usize,
    /// Files that passed the image filter and were read successfully
    pub accepted:  usize,
}

impl UploadReport {
    pub fn feedback(&self) -> String {
        format!("{} image(s) added successfully.", self.accepted)
    }
}

/// Image MIME type for a path, judged by extension. `None` for anything the
/// image crate does not recognize as an image format.
pub fn image_mime_type(path: &Path) -> Option<&'static str> {
    ImageFormat::from_path(path)
        .ok()
        .map(|f| f.to_mime_type())
        .filter(|m| m.starts_with("image/"))
}

/// Expand directories (recursively, sorted by file name); plain files pass through.
pub fn expand_inputs<P: AsRef<Path>>(inputs: &[P]) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for input in inputs {
        let input = input.as_ref();
        if input.is_dir() {
            out.extend(
                WalkDir::new(input)
                    .follow_links(false)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_file())
                    .map(|e| e.into_path()),
            );
        } else {
            out.push(input.to_path_buf());
        }
    }
    out
}

/// Read every image among `inputs` concurrently. Non-image files are skipped
/// with a warning and unreadable files with an error log; neither aborts
/// the batch. Output order follows input order.
pub async fn read_images<P: AsRef<Path>>(inputs: &[P]) -> (Vec<NewImage>, UploadReport) {
    let files = expand_inputs(inputs);
    let processed = files.len();

    let reads = files.into_iter().filter_map(|path| {
        let Some(mime) = image_mime_type(&path) else {
            log::warn!("Skipping non-image file: {}", path.display());
            return None;
        };
        Some(async move {
            match tokio::fs::read(&path).await {
                Ok(bytes) => Some(NewImage::from_bytes(SourceKind::Uploaded, mime, &bytes)),
                Err(e) => {
                    log::error!("Failed to read file: {}: {}", path.display(), e);
                    None
                }
            }
        })
    });

    let images: Vec<NewImage> = join_all(reads).await.into_iter().flatten().collect();
    let report = UploadReport { processed, accepted: images.len() };
    log::info!("upload: {} of {} file(s) accepted", report.accepted, report.processed);
    (images, report)
}

// ── Tests ─────────────────────────────────────────────────────────────────
