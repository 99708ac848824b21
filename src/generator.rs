use crate::error::IconError;

use image::{
    ColorType, DynamicImage, GenericImageView, ImageFormat, ImageReader, Rgba32FImage,
    imageops::{self, FilterType},
};
use log::debug;
use std::{
    io::{self, Write},
    num::NonZeroU32,
    path::{Path, PathBuf},
};

/// Edge lengths of the square icons produced on every run, in output order.
pub const TARGET_SIZES: [u32; 8] = [16, 19, 32, 38, 48, 64, 128, 256];

pub const ICONS_DIR: &str = "icons";
pub const SOURCE_FILE: &str = "logo.png";

const FILTER: FilterType = FilterType::Lanczos3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedIcon {
    pub size: u32,
    pub path: PathBuf,
}

/// Walks up from `start` to the first directory holding `icons/logo.png`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(ICONS_DIR).join(SOURCE_FILE).is_file())
        .map(Path::to_path_buf)
}

#[derive(Debug, Clone)]
pub struct IconGenerator {
    root: PathBuf,
    sizes: Vec<NonZeroU32>,
}

impl IconGenerator {
    /// Creates a generator whose `icons/` directory lives under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sizes: TARGET_SIZES.iter().copied().filter_map(NonZeroU32::new).collect(),
        }
    }

    pub fn with_sizes(mut self, sizes: &[NonZeroU32]) -> Self {
        self.sizes = sizes.to_vec();
        self
    }

    pub fn sizes(&self) -> Vec<u32> {
        self.sizes.iter().map(|s| s.get()).collect()
    }

    pub fn source_path(&self) -> PathBuf {
        self.root.join(ICONS_DIR).join(SOURCE_FILE)
    }

    pub fn output_path(&self, size: u32) -> PathBuf {
        self.root.join(ICONS_DIR).join(format!("icon-{size}.png"))
    }

    pub fn load_source(&self) -> Result<DynamicImage, IconError> {
        let path = self.source_path();
        let load_err = |source| IconError::Load {
            path: path.clone(),
            source,
        };

        let img = ImageReader::open(&path)
            .map_err(|e| load_err(e.into()))?
            .with_guessed_format()
            .map_err(|e| load_err(e.into()))?
            .decode()
            .map_err(load_err)?;

        debug!("Decoded {} as {:?}", path.display(), img.color());
        Ok(img)
    }

    /// Resamples `source` to exactly `size`×`size`; the aspect ratio is not kept.
    ///
    /// Images with an alpha channel are resampled premultiplied, so colour
    /// stored under fully transparent pixels does not bleed into visible edges.
    pub fn resize(source: &DynamicImage, size: u32) -> DynamicImage {
        let color = source.color();
        if !color.has_alpha() {
            return source.resize_exact(size, size, FILTER);
        }

        let mut buf = source.to_rgba32f();
        premultiply(&mut buf);
        let mut resized = imageops::resize(&buf, size, size, FILTER);
        unpremultiply(&mut resized);
        restore_color(resized, color)
    }

    /// Runs the generator, printing progress to stdout.
    pub fn run(&self) -> Result<Vec<GeneratedIcon>, IconError> {
        self.run_with(&mut io::stdout().lock())
    }

    /// Loads the source once, then writes one PNG per configured size.
    ///
    /// Stops at the first write failure. Icons written before the failure are
    /// left on disk.
    pub fn run_with(&self, progress: &mut dyn Write) -> Result<Vec<GeneratedIcon>, IconError> {
        let logo = self.load_source()?;
        let (width, height) = logo.dimensions();
        notify(progress, format_args!("Original logo size: {width}x{height}"));
        debug!("Resampling with {FILTER:?}");

        let mut generated = Vec::with_capacity(self.sizes.len());
        for size in self.sizes.iter().map(|s| s.get()) {
            let resized = Self::resize(&logo, size);
            let path = self.output_path(size);
            resized
                .save_with_format(&path, ImageFormat::Png)
                .map_err(|source| IconError::Write {
                    path: path.clone(),
                    source,
                })?;

            let shown = path.strip_prefix(&self.root).unwrap_or(&path);
            notify(progress, format_args!("Created {} ({size}x{size})", shown.display()));
            generated.push(GeneratedIcon { size, path });
        }

        notify(progress, format_args!("All icon sizes created!"));
        Ok(generated)
    }
}

// 进度输出失败不影响生成结果
fn notify(progress: &mut dyn Write, line: std::fmt::Arguments<'_>) {
    debug!("{line}");
    if let Err(e) = writeln!(progress, "{line}") {
        debug!("Failed to write progress: {e}");
    }
}

fn premultiply(buf: &mut Rgba32FImage) {
    for px in buf.pixels_mut() {
        let a = px[3];
        px[0] *= a;
        px[1] *= a;
        px[2] *= a;
    }
}

fn unpremultiply(buf: &mut Rgba32FImage) {
    for px in buf.pixels_mut() {
        // Lanczos can ring slightly outside [0, 1]
        let a = px[3].clamp(0.0, 1.0);
        for c in 0..3 {
            px[c] = if a > 0.0 { (px[c] / a).clamp(0.0, 1.0) } else { 0.0 };
        }
        px[3] = a;
    }
}

fn restore_color(buf: Rgba32FImage, color: ColorType) -> DynamicImage {
    let img = DynamicImage::ImageRgba32F(buf);
    match color {
        ColorType::La8 => DynamicImage::ImageLumaA8(img.to_luma_alpha8()),
        ColorType::La16 => DynamicImage::ImageLumaA16(img.to_luma_alpha16()),
        ColorType::Rgba16 => DynamicImage::ImageRgba16(img.to_rgba16()),
        ColorType::Rgba32F => img,
        _ => DynamicImage::ImageRgba8(img.to_rgba8()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::fs;
    use tempfile::TempDir;

    fn nz(v: u32) -> NonZeroU32 {
        NonZeroU32::new(v).unwrap()
    }

    #[test]
    fn output_paths_follow_size_pattern() {
        let generator = IconGenerator::new("/project");
        assert_eq!(generator.source_path(), Path::new("/project/icons/logo.png"));
        assert_eq!(generator.output_path(19), Path::new("/project/icons/icon-19.png"));
    }

    #[test]
    fn defaults_to_target_sizes() {
        let generator = IconGenerator::new(".");
        assert_eq!(generator.sizes(), TARGET_SIZES);
        assert_eq!(generator.with_sizes(&[nz(8), nz(4)]).sizes(), [8, 4]);
    }

    #[test]
    fn resize_forces_square() {
        let wide = DynamicImage::ImageRgba8(RgbaImage::new(300, 100));
        let resized = IconGenerator::resize(&wide, 38);
        assert_eq!(resized.dimensions(), (38, 38));
    }

    #[test]
    fn resize_keeps_pixel_format() {
        let gray = DynamicImage::ImageLuma8(image::GrayImage::new(64, 64));
        assert_eq!(IconGenerator::resize(&gray, 16).color(), ColorType::L8);

        let gray_alpha = DynamicImage::ImageLumaA8(image::GrayAlphaImage::new(64, 64));
        assert_eq!(IconGenerator::resize(&gray_alpha, 16).color(), ColorType::La8);

        let rgba = DynamicImage::ImageRgba8(RgbaImage::new(64, 64));
        assert_eq!(IconGenerator::resize(&rgba, 16).color(), ColorType::Rgba8);
    }

    #[test]
    fn transparent_edge_does_not_darken_visible_pixels() {
        // 左半透明黑, 右半不透明白
        let logo = RgbaImage::from_fn(64, 64, |x, _| {
            if x < 32 { Rgba([0, 0, 0, 0]) } else { Rgba([255, 255, 255, 255]) }
        });

        let resized = IconGenerator::resize(&DynamicImage::ImageRgba8(logo), 16).to_rgba8();

        let mut partial = 0;
        for px in resized.pixels().filter(|px| px[3] > 0) {
            assert_eq!([px[0], px[1], px[2]], [255, 255, 255], "fringe pixel {px:?}");
            if px[3] < 255 {
                partial += 1;
            }
        }
        assert!(partial > 0);
    }

    #[test]
    fn opaque_resize_is_unaffected_by_alpha_handling() {
        let logo = RgbaImage::from_pixel(32, 32, Rgba([200, 40, 90, 255]));
        let resized = IconGenerator::resize(&DynamicImage::ImageRgba8(logo), 8).to_rgba8();
        assert!(resized.pixels().all(|px| *px == Rgba([200, 40, 90, 255])));
    }

    #[test]
    fn finds_root_above_binary_location() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("icons")).unwrap();
        fs::write(dir.path().join("icons/logo.png"), b"").unwrap();
        let exe = dir.path().join("target/release/icongen");

        assert_eq!(find_project_root(&exe).as_deref(), Some(dir.path()));
    }

    #[test]
    fn no_root_without_logo() {
        let dir = TempDir::new().unwrap();
        let exe = dir.path().join("target/release/icongen");
        let found = find_project_root(&exe);
        assert!(found.is_none_or(|root| !root.starts_with(dir.path())));
    }
}
