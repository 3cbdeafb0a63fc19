// ============================================================================
// Drawing Surface
// ============================================================================
//
// Coordinates are millimetres measured from the TOP-LEFT corner of the page,
// the way the layout code reasons about a downward-moving cursor. The PDF
// implementation flips them to PDF's bottom-left origin.

use crate::error::{AppError, Result};
use crate::metrics::{self, FontWeight};
use ::image::{DynamicImage, Rgba, RgbImage};
use printpdf::path::PaintMode;
use printpdf::*;
use std::fs;
use std::io::BufWriter;
use std::path::Path;

/// A4 portrait, in mm.
pub const A4_WIDTH_MM: f32 = 210.0;
pub const A4_HEIGHT_MM: f32 = 297.0;

/// Line height as a multiple of the font size.
pub const LINE_HEIGHT_FACTOR: f32 = 1.15;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RgbColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl RgbColor {
    pub const BLACK: RgbColor = RgbColor::gray(0.0);
    pub const WHITE: RgbColor = RgbColor::gray(1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        RgbColor { r, g, b }
    }

    pub const fn gray(level: f32) -> Self {
        RgbColor::new(level, level, level)
    }

    fn to_pdf(self) -> printpdf::Color {
        printpdf::Color::Rgb(Rgb::new(self.r, self.g, self.b, None))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FillMode {
    Stroke,
    Fill(RgbColor),
    FillStroke(RgbColor),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Right,
    Center,
}

/// Everything the layout code needs from an output medium.
///
/// Font state (weight and size) is explicit and sticky, so callers that
/// change it are expected to put it back when they are done.
pub trait DrawingSurface {
    fn page_size(&self) -> (f32, f32);

    fn set_font_size(&mut self, size_pt: f32);
    fn font_size(&self) -> f32;
    fn set_font(&mut self, weight: FontWeight);
    fn font(&self) -> FontWeight;
    fn set_text_color(&mut self, color: RgbColor);
    /// Stroke colour and width (in points) for lines and rectangle borders.
    fn set_line_style(&mut self, color: RgbColor, width_pt: f32);

    /// Draw one line of text with its baseline at `y`.
    fn text(&mut self, text: &str, x: f32, y: f32, align: TextAlign) -> Result<()>;
    fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, mode: FillMode) -> Result<()>;
    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Result<()>;
    /// Place an image inside the `w` x `h` box whose top-left corner is at
    /// (`x`, `y`), preserving its aspect ratio.
    fn add_image(&mut self, image: &DynamicImage, x: f32, y: f32, w: f32, h: f32) -> Result<()>;
    fn add_page(&mut self) -> Result<()>;
    fn page_count(&self) -> usize;

    fn text_width(&self, text: &str) -> f32 {
        metrics::text_width(text, self.font(), self.font_size())
    }

    fn line_height(&self) -> f32 {
        metrics::line_height(self.font_size(), LINE_HEIGHT_FACTOR)
    }

    /// Wrap `text` to `max_width` using the current font and size.
    fn split_text_to_size(&self, text: &str, max_width: f32) -> Vec<String> {
        metrics::split_text_to_size(text, max_width, self.font(), self.font_size())
    }

    /// Left edge of `text` when anchored at `x` with `align`.
    fn aligned_x(&self, text: &str, x: f32, align: TextAlign) -> f32 {
        match align {
            TextAlign::Left => x,
            TextAlign::Right => x - self.text_width(text),
            TextAlign::Center => x - self.text_width(text) / 2.0,
        }
    }
}

/// Size of an image scaled to fit a box while keeping its aspect ratio.
pub fn fit_within(width_px: u32, height_px: u32, max_w: f32, max_h: f32) -> (f32, f32) {
    if width_px == 0 || height_px == 0 {
        return (0.0, 0.0);
    }
    let aspect_ratio = width_px as f32 / height_px as f32;
    if max_w / max_h > aspect_ratio {
        // Height-constrained
        (max_h * aspect_ratio, max_h)
    } else {
        // Width-constrained
        (max_w, max_w / aspect_ratio)
    }
}

// ============================================================================
// PDF Surface
// ============================================================================

fn write_then_rename(tmp: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    use std::io::Write;
    let file = fs::File::create(tmp)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(bytes)?;
    writer.flush()?;
    drop(writer);
    fs::rename(tmp, path)?;
    Ok(())
}

pub struct PdfSurface {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    font_regular: IndirectFontRef,
    font_bold: IndirectFontRef,
    width: f32,
    height: f32,
    font_size: f32,
    weight: FontWeight,
    text_color: RgbColor,
    pages: usize,
}

impl PdfSurface {
    pub fn new(title: &str, width_mm: f32, height_mm: f32) -> Result<Self> {
        let (doc, page1, layer1) = PdfDocument::new(title, Mm(width_mm), Mm(height_mm), "Layer 1");
        let layer = doc.get_page(page1).get_layer(layer1);

        let font_regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| AppError::Pdf(e.to_string()))?;
        let font_bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| AppError::Pdf(e.to_string()))?;

        Ok(PdfSurface {
            doc,
            layer,
            font_regular,
            font_bold,
            width: width_mm,
            height: height_mm,
            font_size: 12.0,
            weight: FontWeight::Normal,
            text_color: RgbColor::BLACK,
            pages: 1,
        })
    }

    pub fn a4(title: &str) -> Result<Self> {
        Self::new(title, A4_WIDTH_MM, A4_HEIGHT_MM)
    }

    /// Serialize the document and write it to `path`. The bytes are produced
    /// in memory and moved into place in one rename, so a failure never
    /// leaves a truncated file at `path`.
    pub fn save(self, path: &Path) -> Result<()> {
        let bytes = self
            .doc
            .save_to_bytes()
            .map_err(|e| AppError::Pdf(e.to_string()))?;
        let tmp = path.with_extension("pdf.part");
        if let Err(e) = write_then_rename(&tmp, path, &bytes) {
            fs::remove_file(&tmp).ok();
            return Err(e);
        }
        Ok(())
    }

    fn pdf_y(&self, y: f32) -> f32 {
        self.height - y
    }

    fn current_font(&self) -> &IndirectFontRef {
        match self.weight {
            FontWeight::Normal => &self.font_regular,
            FontWeight::Bold => &self.font_bold,
        }
    }
}

impl DrawingSurface for PdfSurface {
    fn page_size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn set_font_size(&mut self, size_pt: f32) {
        self.font_size = size_pt;
    }

    fn font_size(&self) -> f32 {
        self.font_size
    }

    fn set_font(&mut self, weight: FontWeight) {
        self.weight = weight;
    }

    fn font(&self) -> FontWeight {
        self.weight
    }

    fn set_text_color(&mut self, color: RgbColor) {
        self.text_color = color;
    }

    fn set_line_style(&mut self, color: RgbColor, width_pt: f32) {
        self.layer.set_outline_color(color.to_pdf());
        self.layer.set_outline_thickness(width_pt);
    }

    fn text(&mut self, text: &str, x: f32, y: f32, align: TextAlign) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        let x = self.aligned_x(text, x, align);
        // Text is painted with the fill colour, which rectangles also change.
        self.layer.set_fill_color(self.text_color.to_pdf());
        self.layer.use_text(
            text,
            self.font_size,
            Mm(x),
            Mm(self.pdf_y(y)),
            self.current_font(),
        );
        Ok(())
    }

    fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, mode: FillMode) -> Result<()> {
        let (paint, fill) = match mode {
            FillMode::Stroke => (PaintMode::Stroke, None),
            FillMode::Fill(color) => (PaintMode::Fill, Some(color)),
            FillMode::FillStroke(color) => (PaintMode::FillStroke, Some(color)),
        };
        if let Some(color) = fill {
            self.layer.set_fill_color(color.to_pdf());
        }
        let rect = Rect::new(Mm(x), Mm(self.pdf_y(y + h)), Mm(x + w), Mm(self.pdf_y(y)))
            .with_mode(paint);
        self.layer.add_rect(rect);
        self.layer.set_fill_color(self.text_color.to_pdf());
        Ok(())
    }

    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Result<()> {
        let points = vec![
            (Point::new(Mm(x1), Mm(self.pdf_y(y1))), false),
            (Point::new(Mm(x2), Mm(self.pdf_y(y2))), false),
        ];
        let line = Line {
            points,
            is_closed: false,
        };
        self.layer.add_line(line);
        Ok(())
    }

    fn add_image(&mut self, image: &DynamicImage, x: f32, y: f32, w: f32, h: f32) -> Result<()> {
        // Convert to RGBA first to handle transparency
        let rgba_image = image.to_rgba8();
        let (width_px, height_px) = rgba_image.dimensions();
        if width_px == 0 || height_px == 0 {
            return Err(AppError::Logo("image has no pixels".to_string()));
        }

        // Composite against white background
        let mut rgb_image = RgbImage::new(width_px, height_px);
        for (px, py, pixel) in rgba_image.enumerate_pixels() {
            let Rgba([r, g, b, a]) = *pixel;
            let alpha = a as f32 / 255.0;
            let bg = 255.0;
            let out_r = (r as f32 * alpha + bg * (1.0 - alpha)) as u8;
            let out_g = (g as f32 * alpha + bg * (1.0 - alpha)) as u8;
            let out_b = (b as f32 * alpha + bg * (1.0 - alpha)) as u8;
            rgb_image.put_pixel(px, py, ::image::Rgb([out_r, out_g, out_b]));
        }

        let (final_w, final_h) = fit_within(width_px, height_px, w, h);

        let pdf_image = Image::from(ImageXObject {
            width: Px(width_px as usize),
            height: Px(height_px as usize),
            color_space: ColorSpace::Rgb,
            bits_per_component: ColorBits::Bit8,
            interpolate: true,
            image_data: rgb_image.into_raw(),
            image_filter: None,
            clipping_bbox: None,
            smask: None,
        });

        // DPI = pixels / (mm / 25.4)
        let dpi = (width_px as f32) / (final_w / 25.4);

        pdf_image.add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(x)),
                translate_y: Some(Mm(self.pdf_y(y + final_h))),
                dpi: Some(dpi),
                ..Default::default()
            },
        );
        Ok(())
    }

    fn add_page(&mut self) -> Result<()> {
        let (page, layer) = self.doc.add_page(Mm(self.width), Mm(self.height), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.pages += 1;
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.pages
    }
}

// ============================================================================
// Recording Surface
// ============================================================================

/// One recorded drawing call. Pages are numbered from 1.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        page: usize,
        text: String,
        x: f32,
        y: f32,
        weight: FontWeight,
        size: f32,
        color: RgbColor,
    },
    Rect {
        page: usize,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        mode: FillMode,
    },
    Line {
        page: usize,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
    },
    Image {
        page: usize,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
    },
}

/// Keeps every call in memory instead of producing a file. Measurements use
/// the same font metrics as the PDF surface, so layouts match.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    width: f32,
    height: f32,
    font_size: f32,
    weight: FontWeight,
    text_color: RgbColor,
    pages: usize,
    pub ops: Vec<DrawOp>,
}

impl RecordingSurface {
    pub fn new(width: f32, height: f32) -> Self {
        RecordingSurface {
            width,
            height,
            font_size: 12.0,
            weight: FontWeight::Normal,
            text_color: RgbColor::BLACK,
            pages: 1,
            ops: Vec::new(),
        }
    }

    pub fn a4() -> Self {
        Self::new(A4_WIDTH_MM, A4_HEIGHT_MM)
    }

    /// All text operations as (page, text, x, y, weight).
    pub fn texts(&self) -> Vec<(usize, &str, f32, f32, FontWeight)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text {
                    page,
                    text,
                    x,
                    y,
                    weight,
                    ..
                } => Some((*page, text.as_str(), *x, *y, *weight)),
                _ => None,
            })
            .collect()
    }

    /// First text operation whose content starts with `prefix`.
    pub fn find_text(&self, prefix: &str) -> Option<(usize, &str, f32, f32, FontWeight)> {
        self.texts().into_iter().find(|t| t.1.starts_with(prefix))
    }
}

impl DrawingSurface for RecordingSurface {
    fn page_size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn set_font_size(&mut self, size_pt: f32) {
        self.font_size = size_pt;
    }

    fn font_size(&self) -> f32 {
        self.font_size
    }

    fn set_font(&mut self, weight: FontWeight) {
        self.weight = weight;
    }

    fn font(&self) -> FontWeight {
        self.weight
    }

    fn set_text_color(&mut self, color: RgbColor) {
        self.text_color = color;
    }

    fn set_line_style(&mut self, _color: RgbColor, _width_pt: f32) {}

    fn text(&mut self, text: &str, x: f32, y: f32, align: TextAlign) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        let x = self.aligned_x(text, x, align);
        self.ops.push(DrawOp::Text {
            page: self.pages,
            text: text.to_string(),
            x,
            y,
            weight: self.weight,
            size: self.font_size,
            color: self.text_color,
        });
        Ok(())
    }

    fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, mode: FillMode) -> Result<()> {
        self.ops.push(DrawOp::Rect {
            page: self.pages,
            x,
            y,
            w,
            h,
            mode,
        });
        Ok(())
    }

    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Result<()> {
        self.ops.push(DrawOp::Line {
            page: self.pages,
            x1,
            y1,
            x2,
            y2,
        });
        Ok(())
    }

    fn add_image(&mut self, image: &DynamicImage, x: f32, y: f32, w: f32, h: f32) -> Result<()> {
        let (w, h) = fit_within(image.width(), image.height(), w, h);
        self.ops.push(DrawOp::Image {
            page: self.pages,
            x,
            y,
            w,
            h,
        });
        Ok(())
    }

    fn add_page(&mut self) -> Result<()> {
        self.pages += 1;
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_within_keeps_aspect_ratio() {
        let (w, h) = fit_within(200, 100, 40.0, 40.0);
        assert!((w - 40.0).abs() < 1e-4);
        assert!((h - 20.0).abs() < 1e-4);

        let (w, h) = fit_within(100, 200, 40.0, 20.0);
        assert!((w - 10.0).abs() < 1e-4);
        assert!((h - 20.0).abs() < 1e-4);
    }

    #[test]
    fn test_right_aligned_text_ends_at_anchor() {
        let mut surface = RecordingSurface::a4();
        surface.set_font_size(12.0);
        surface.text("550.00 €", 200.0, 50.0, TextAlign::Right).unwrap();
        let (_, text, x, _, _) = surface.texts()[0];
        let width = surface.text_width(text);
        assert!((x + width - 200.0).abs() < 1e-3);
    }

    #[test]
    fn test_empty_text_is_not_recorded() {
        let mut surface = RecordingSurface::a4();
        surface.text("", 10.0, 10.0, TextAlign::Left).unwrap();
        assert!(surface.ops.is_empty());
    }

    #[test]
    fn test_pages_are_counted() {
        let mut surface = RecordingSurface::a4();
        surface.add_page().unwrap();
        surface.line(0.0, 0.0, 10.0, 0.0).unwrap();
        assert_eq!(surface.page_count(), 2);
        assert!(matches!(surface.ops[0], DrawOp::Line { page: 2, .. }));
    }

    #[test]
    fn test_pdf_surface_saves_a_file() {
        let mut surface = PdfSurface::a4("Test").unwrap();
        surface.set_font(FontWeight::Bold);
        surface.text("DEVIS", 10.0, 20.0, TextAlign::Left).unwrap();
        surface
            .rect(140.0, 10.0, 60.0, 10.0, FillMode::Fill(RgbColor::gray(0.9)))
            .unwrap();
        let path = std::env::temp_dir().join(format!("devis-pdf-surface-{}.pdf", uuid::Uuid::new_v4()));
        surface.save(&path).unwrap();
        let len = fs::metadata(&path).unwrap().len();
        assert!(len > 500);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_failed_save_leaves_no_partial_file() {
        let dir = std::env::temp_dir().join(format!("devis-pdf-save-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        // A directory in the way makes the final rename fail.
        let target = dir.join("devis.pdf");
        fs::create_dir_all(target.join("occupied")).unwrap();

        let surface = PdfSurface::a4("Test").unwrap();
        assert!(surface.save(&target).is_err());
        assert!(!dir.join("devis.pdf.part").exists());
        fs::remove_dir_all(&dir).ok();
    }
}
