//! Rasterizing PDF pages into a single stacked JPEG
//!
//! Pages are rendered in-process with PDFium straight to images, then stacked top
//! to bottom on one canvas as wide as the widest page. The vision model sees a
//! whole section (or the first pages of a manual) as one image.

use crate::collaborator::CollaboratorError;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbImage};
use pdfium_render::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// PDF user space units per inch
const POINTS_PER_INCH: f32 = 72.0;

/// Renders PDF pages to a single image file
pub trait PageRasterizer {
    /// Render the first `max_pages` pages of `pdf` (all pages when `None`) and
    /// write them, stacked vertically, as a JPEG to `out_jpeg`
    fn rasterize(
        &self,
        pdf: &Path,
        max_pages: Option<usize>,
        out_jpeg: &Path,
    ) -> Result<(), CollaboratorError>;
}

/// PDFium-based rasterizer
///
/// The PDFium library is bound on first use and kept for the rasterizer's
/// lifetime.
pub struct PdfRasterizer {
    library: Option<PathBuf>,
    dpi: u32,
    jpeg_quality: u8,
    pdfium: OnceLock<Pdfium>,
}

impl PdfRasterizer {
    /// Create a rasterizer
    ///
    /// # Parameters
    /// * `library` - PDFium shared library to load; `None` locates it (downloading
    ///   and caching it if needed)
    /// * `dpi` - Render resolution
    /// * `jpeg_quality` - Quality of the stacked JPEG, 1 to 100
    pub fn new(library: Option<PathBuf>, dpi: u32, jpeg_quality: u8) -> Self {
        Self {
            library,
            dpi: dpi.max(1),
            jpeg_quality: jpeg_quality.clamp(1, 100),
            pdfium: OnceLock::new(),
        }
    }

    fn pdfium(&self) -> Result<&Pdfium, CollaboratorError> {
        if let Some(pdfium) = self.pdfium.get() {
            return Ok(pdfium);
        }

        let bound = match &self.library {
            Some(path) => pdfium_auto::bind_pdfium_from_path(path),
            None => pdfium_auto::bind_pdfium_silent(),
        }
        .map_err(|e| CollaboratorError::Pdf(format!("Failed to load PDFium: {}", e)))?;
        log::debug!("PDFium loaded");

        Ok(self.pdfium.get_or_init(|| bound))
    }

    /// Render the first `max_pages` pages of `pdf` (all when `None`) in page order
    pub fn render_pages(
        &self,
        pdf: &Path,
        max_pages: Option<usize>,
    ) -> Result<Vec<DynamicImage>, CollaboratorError> {
        let pdfium = self.pdfium()?;
        let document = pdfium.load_pdf_from_file(pdf, None).map_err(|e| {
            CollaboratorError::Pdf(format!("Failed to open {}: {:?}", pdf.display(), e))
        })?;

        let render_config =
            PdfRenderConfig::new().scale_page_by_factor(self.dpi as f32 / POINTS_PER_INCH);

        let mut images = Vec::new();
        for (index, page) in document
            .pages()
            .iter()
            .take(max_pages.unwrap_or(usize::MAX))
            .enumerate()
        {
            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                CollaboratorError::Pdf(format!(
                    "Failed to render page {} of {}: {:?}",
                    index + 1,
                    pdf.display(),
                    e
                ))
            })?;
            let image = bitmap.as_image();
            log::debug!(
                "Rendered page {} of {} at {} dpi: {}x{} px",
                index + 1,
                pdf.display(),
                self.dpi,
                image.width(),
                image.height()
            );
            images.push(image);
        }

        Ok(images)
    }
}

impl Default for PdfRasterizer {
    fn default() -> Self {
        Self::new(None, 50, 95)
    }
}

impl PageRasterizer for PdfRasterizer {
    fn rasterize(
        &self,
        pdf: &Path,
        max_pages: Option<usize>,
        out_jpeg: &Path,
    ) -> Result<(), CollaboratorError> {
        let pages = self.render_pages(pdf, max_pages)?;
        if pages.is_empty() {
            return Err(CollaboratorError::Pdf(format!(
                "{} has no pages",
                pdf.display()
            )));
        }

        let stacked = stack_pages(&pages);
        write_jpeg(&stacked, out_jpeg, self.jpeg_quality)?;

        log::info!(
            "Rasterized {} pages of {} into {}",
            pages.len(),
            pdf.display(),
            out_jpeg.display()
        );
        Ok(())
    }
}

/// Stack page images top to bottom on a black canvas
///
/// The canvas is as wide as the widest page and as tall as all pages together;
/// narrower pages are left-aligned.
pub fn stack_pages(pages: &[DynamicImage]) -> RgbImage {
    let width = pages.iter().map(DynamicImage::width).max().unwrap_or(0);
    let height = pages.iter().map(DynamicImage::height).sum();

    let mut canvas = RgbImage::new(width, height);
    let mut y = 0i64;
    for page in pages {
        image::imageops::overlay(&mut canvas, &page.to_rgb8(), 0, y);
        y += i64::from(page.height());
    }
    canvas
}

/// Encode an RGB image as JPEG bytes at the given quality
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, CollaboratorError> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100)).encode_image(image)?;
    Ok(bytes)
}

/// Encode an RGB image as JPEG at the given quality
pub fn write_jpeg(image: &RgbImage, path: &Path, quality: u8) -> Result<(), CollaboratorError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&encode_jpeg(image, quality)?)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb};

    fn solid(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
    }

    #[test]
    fn test_stack_pages_dimensions_and_placement() {
        let pages = vec![solid(40, 10, [255, 0, 0]), solid(20, 30, [0, 0, 255])];

        let stacked = stack_pages(&pages);

        assert_eq!(stacked.dimensions(), (40, 40));
        assert_eq!(stacked.get_pixel(39, 5), &Rgb([255, 0, 0]));
        assert_eq!(stacked.get_pixel(5, 25), &Rgb([0, 0, 255]));
        // Right of the narrower page stays black
        assert_eq!(stacked.get_pixel(30, 25), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_stack_no_pages() {
        assert_eq!(stack_pages(&[]).dimensions(), (0, 0));
    }

    #[test]
    fn test_write_jpeg_is_decodable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.jpg");

        write_jpeg(&stack_pages(&[solid(16, 8, [10, 200, 30])]), &path, 95).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), image::ImageFormat::Jpeg);
        assert_eq!(image::load_from_memory(&bytes).unwrap().dimensions(), (16, 8));
    }

    #[test]
    fn test_unloadable_library_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let rasterizer = PdfRasterizer::new(Some(dir.path().join("libpdfium.so")), 50, 95);
        let out = dir.path().join("out.jpg");

        let err = rasterizer
            .rasterize(Path::new("manual.pdf"), Some(3), &out)
            .unwrap_err();

        assert!(matches!(err, CollaboratorError::Pdf(ref message) if message.starts_with("Failed to load PDFium")));
        assert!(!out.exists());
    }

    /// Two pages, 1in x 1in and 1in x 2in; PDFium rebuilds the missing xref table
    const TWO_PAGE_PDF: &str = "%PDF-1.4
1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj
2 0 obj << /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 >> endobj
3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 72 72] >> endobj
4 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 72 144] >> endobj
trailer << /Root 1 0 R >>
%%EOF
";

    #[test]
    #[ignore = "needs the PDFium library"]
    fn test_rasterize_stacks_rendered_pages() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("manual.pdf");
        std::fs::write(&pdf, TWO_PAGE_PDF).unwrap();
        let rasterizer = PdfRasterizer::new(None, 72, 95);

        let pages = rasterizer.render_pages(&pdf, None).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(rasterizer.render_pages(&pdf, Some(1)).unwrap().len(), 1);

        let out = dir.path().join("stacked.jpg");
        rasterizer.rasterize(&pdf, None, &out).unwrap();
        let stacked = image::open(&out).unwrap();
        assert_eq!(stacked.width(), pages[0].width().max(pages[1].width()));
        assert_eq!(stacked.height(), pages[0].height() + pages[1].height());
    }
}
