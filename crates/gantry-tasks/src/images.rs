//! Images task: a webp variant and an optimized original per image.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{ColorType, DynamicImage, ImageEncoder};
use rayon::prelude::*;

use crate::paths::ProjectPaths;
use crate::task::{write_output, Batch, TaskError};

/// Default quality for re-encoded jpegs.
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Formats that get a webp variant.
const RASTER_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

/// Process every image in the source set.
///
/// The two variants of an image are produced independently; a failure in
/// one is logged and does not affect the other or any other image.
pub fn run(paths: &ProjectPaths, jpeg_quality: u8) -> Batch {
    let sources = paths.source.img.walk(paths.root());
    let src_dir = paths.img_src_dir();

    let results: Vec<Vec<Result<PathBuf, TaskError>>> = sources
        .par_iter()
        .map(|source| {
            let relative = source.strip_prefix(&src_dir).unwrap_or(source);
            let target = paths.build.img.join(relative);

            let mut results = Vec::with_capacity(2);
            if is_raster(source) {
                results.push(write_webp(source, &target.with_extension("webp")));
            }
            results.push(write_optimized(source, &target, jpeg_quality));
            results
        })
        .collect();

    Batch::collect(results.into_iter().flatten())
}

fn is_raster(path: &Path) -> bool {
    extension(path).is_some_and(|ext| RASTER_EXTENSIONS.contains(&ext.as_str()))
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn open(source: &Path) -> Result<DynamicImage, TaskError> {
    image::open(source).map_err(|e| TaskError::convert(source, e))
}

/// Encode a lossless webp copy.
pub fn write_webp(source: &Path, target: &Path) -> Result<PathBuf, TaskError> {
    let rgba = open(source)?.to_rgba8();

    let mut encoded = Vec::new();
    WebPEncoder::new_lossless(&mut encoded)
        .encode(rgba.as_raw(), rgba.width(), rgba.height(), ColorType::Rgba8)
        .map_err(|e| TaskError::convert(source, e))?;

    write_output(target, encoded)?;
    Ok(target.to_path_buf())
}

/// Re-encode in the original format, keeping the original bytes when the
/// re-encoded file is not smaller.
///
/// Jpeg output is baseline and png output is not interlaced; the `image`
/// encoders have no progressive or Adam7 mode.
pub fn write_optimized(source: &Path, target: &Path, jpeg_quality: u8) -> Result<PathBuf, TaskError> {
    let original = fs::read(source).map_err(|e| TaskError::read(source, e))?;

    let optimized = match extension(source).as_deref() {
        Some("png") => Some(encode_png(source)?),
        Some("jpg" | "jpeg") => Some(encode_jpeg(source, jpeg_quality)?),
        // gif animations, vectors, icons and webp are copied as-is
        _ => None,
    };

    let bytes = match optimized {
        Some(bytes) if bytes.len() < original.len() => bytes,
        _ => original,
    };

    write_output(target, bytes)?;
    Ok(target.to_path_buf())
}

fn encode_png(source: &Path) -> Result<Vec<u8>, TaskError> {
    let img = open(source)?;

    let mut encoded = Vec::new();
    PngEncoder::new_with_quality(&mut encoded, CompressionType::Best, FilterType::Adaptive)
        .write_image(img.as_bytes(), img.width(), img.height(), img.color())
        .map_err(|e| TaskError::convert(source, e))?;

    Ok(encoded)
}

fn encode_jpeg(source: &Path, quality: u8) -> Result<Vec<u8>, TaskError> {
    let rgb = open(source)?.to_rgb8();

    let mut encoded = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut encoded, quality)
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
        .map_err(|e| TaskError::convert(source, e))?;

    Ok(encoded.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::PathsConfig;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use tempfile::tempdir;

    fn project() -> (tempfile::TempDir, ProjectPaths) {
        let temp = tempdir().unwrap();
        let root = temp.path().join("site");
        let img = root.join("src/img");
        fs::create_dir_all(img.join("hero")).unwrap();

        let png = RgbaImage::from_fn(32, 32, |x, y| Rgba([(x * 8) as u8, (y * 8) as u8, 120, 255]));
        png.save(img.join("logo.png")).unwrap();

        let jpg = RgbImage::from_fn(48, 24, |x, _| Rgb([(x * 5) as u8, 40, 200]));
        jpg.save(img.join("hero/bg.jpg")).unwrap();

        fs::write(img.join("icon.svg"), "<svg xmlns=\"http://www.w3.org/2000/svg\"/>").unwrap();

        let paths = ProjectPaths::new(&root, &PathsConfig::default());
        (temp, paths)
    }

    #[test]
    fn emits_two_outputs_per_raster_image() {
        let (_temp, paths) = project();

        let batch = run(&paths, DEFAULT_JPEG_QUALITY);

        assert_eq!(batch.failed, 0);
        // two raster inputs x two variants, plus the copied svg
        assert_eq!(batch.outputs.len(), 5);
        assert!(paths.build.img.join("logo.webp").exists());
        assert!(paths.build.img.join("logo.png").exists());
        assert!(paths.build.img.join("hero/bg.webp").exists());
        assert!(paths.build.img.join("hero/bg.jpg").exists());
        assert!(paths.build.img.join("icon.svg").exists());
    }

    #[test]
    fn optimized_copy_is_never_larger() {
        let (_temp, paths) = project();

        run(&paths, DEFAULT_JPEG_QUALITY);

        let original = fs::metadata(paths.img_src_dir().join("logo.png")).unwrap().len();
        let optimized = fs::metadata(paths.build.img.join("logo.png")).unwrap().len();
        assert!(optimized <= original);
    }

    #[test]
    fn webp_variant_decodes() {
        let (_temp, paths) = project();

        run(&paths, DEFAULT_JPEG_QUALITY);

        let webp = image::open(paths.build.img.join("logo.webp")).unwrap();
        assert_eq!((webp.width(), webp.height()), (32, 32));
    }

    #[test]
    fn isolates_broken_images() {
        let (_temp, paths) = project();
        fs::write(paths.img_src_dir().join("broken.png"), b"not a png").unwrap();

        let batch = run(&paths, DEFAULT_JPEG_QUALITY);

        assert_eq!(batch.failed, 2);
        assert!(paths.build.img.join("logo.webp").exists());
    }
}
