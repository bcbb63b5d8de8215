//! Page geometry and the drawing primitives the payslip is painted with.
//!
//! Positions are expressed in millimetres from the top-left corner of the page, the way the
//! layout is designed. [`Painter`] converts them to PDF user space, whose origin is the bottom-left
//! corner, when drawing onto a `printpdf` layer.

use image::{DynamicImage, GenericImageView};
use printpdf::{Color, Image, Line, Mm, PdfLayerReference, Point, Rgb};

use crate::fonts::{self, FontFamily, FontStyle};

/// A4 portrait width.
pub const PAGE_WIDTH_MM: f64 = 210.0;
/// A4 portrait height.
pub const PAGE_HEIGHT_MM: f64 = 297.0;

const DEFAULT_IMAGE_DPI: f64 = 300.0;
const MM_PER_INCH: f64 = 25.4;
const CELL_PADDING_MM: f64 = 1.0;
const BORDER_THICKNESS_PT: f64 = 0.567;
const TEXT_COLOR: Rgb8 = Rgb8(0, 0, 0);

/// An axis-aligned rectangle, top-left origin, millimetres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole page.
    pub const fn full_page() -> Self {
        Self::new(0.0, 0.0, PAGE_WIDTH_MM, PAGE_HEIGHT_MM)
    }
}

/// An 8-bit RGB colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb8(pub u8, pub u8, pub u8);

impl Rgb8 {
    fn to_color(self) -> Color {
        Color::Rgb(Rgb::new(
            f64::from(self.0) / 255.0,
            f64::from(self.1) / 255.0,
            f64::from(self.2) / 255.0,
            None,
        ))
    }
}

/// Horizontal placement of text inside a cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
}

/// A rectangular cell with one line of text, an optional fill and an optional border.
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    pub rect: Rect,
    pub text: String,
    pub align: TextAlign,
    pub style: FontStyle,
    pub font_size: f64,
    pub fill: Option<Rgb8>,
    pub border: bool,
}

impl Cell {
    /// Creates a bordered, unfilled, left-aligned cell in 12pt regular text.
    pub fn new(rect: Rect, text: impl Into<String>) -> Self {
        Self {
            rect,
            text: text.into(),
            align: TextAlign::Left,
            style: FontStyle::Regular,
            font_size: 12.0,
            fill: None,
            border: true,
        }
    }

    pub fn with_align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    pub fn with_style(mut self, style: FontStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_font_size(mut self, font_size: f64) -> Self {
        self.font_size = font_size;
        self
    }

    pub fn with_fill(mut self, fill: impl Into<Option<Rgb8>>) -> Self {
        self.fill = fill.into();
        self
    }

    pub fn with_border(mut self, border: bool) -> Self {
        self.border = border;
        self
    }

    /// Left edge of the text, honouring the alignment.
    pub fn text_x(&self) -> f64 {
        match self.align {
            TextAlign::Left => self.rect.x + CELL_PADDING_MM,
            TextAlign::Center => {
                let width = fonts::text_width_mm(&self.text, self.style, self.font_size);
                self.rect.x + (self.rect.width - width) / 2.0
            }
        }
    }

    /// Baseline of the text, vertically centred, top-left origin.
    pub fn baseline_y(&self) -> f64 {
        self.rect.y + 0.5 * self.rect.height + 0.3 * fonts::pt_to_mm(self.font_size)
    }
}

/// Loads an image from in-memory bytes using the [`image`] crate.
pub fn decode_image_from_bytes(bytes: impl AsRef<[u8]>) -> Result<DynamicImage, image::ImageError> {
    image::load_from_memory(bytes.as_ref())
}

/// Natural size of `image` in millimetres when printed at `dpi`.
pub fn estimated_image_size(image: &DynamicImage, dpi: f64) -> (f64, f64) {
    let (px_width, px_height) = image.dimensions();
    let width_mm = MM_PER_INCH * f64::from(px_width) / dpi;
    let height_mm = MM_PER_INCH * f64::from(px_height) / dpi;
    (width_mm, height_mm)
}

/// Where an image of `natural` size ends up when fitted into `slot`.
///
/// A slot height of zero keeps the aspect ratio from the slot width.
pub fn fitted_rect(slot: Rect, natural: (f64, f64)) -> Rect {
    let (natural_width, natural_height) = natural;
    let height = if slot.height > 0.0 {
        slot.height
    } else if natural_width > f64::EPSILON {
        natural_height * slot.width / natural_width
    } else {
        0.0
    };
    Rect::new(slot.x, slot.y, slot.width, height)
}

/// Draws cells and images onto one page layer.
pub struct Painter<'a> {
    layer: PdfLayerReference,
    fonts: &'a FontFamily,
    page_height: f64,
}

impl<'a> Painter<'a> {
    pub fn new(layer: PdfLayerReference, fonts: &'a FontFamily) -> Self {
        Self {
            layer,
            fonts,
            page_height: PAGE_HEIGHT_MM,
        }
    }

    fn point(&self, x: f64, y: f64) -> (Point, bool) {
        (Point::new(Mm(x), Mm(self.page_height - y)), false)
    }

    /// Paints the fill, then the border, then the text of `cell`.
    pub fn draw_cell(&self, cell: &Cell) {
        let rect = cell.rect;
        if cell.fill.is_some() || cell.border {
            if let Some(fill) = cell.fill {
                self.layer.set_fill_color(fill.to_color());
            }
            if cell.border {
                self.layer.set_outline_color(TEXT_COLOR.to_color());
                self.layer.set_outline_thickness(BORDER_THICKNESS_PT);
            }
            self.layer.add_shape(Line {
                points: vec![
                    self.point(rect.x, rect.y),
                    self.point(rect.x + rect.width, rect.y),
                    self.point(rect.x + rect.width, rect.y + rect.height),
                    self.point(rect.x, rect.y + rect.height),
                ],
                is_closed: true,
                has_fill: cell.fill.is_some(),
                has_stroke: cell.border,
                is_clipping_path: false,
            });
        }

        if cell.text.is_empty() {
            return;
        }
        self.layer.set_fill_color(TEXT_COLOR.to_color());
        self.layer.use_text(
            cell.text.as_str(),
            cell.font_size,
            Mm(cell.text_x()),
            Mm(self.page_height - cell.baseline_y()),
            self.fonts.get(cell.style),
        );
    }

    /// Places `image` into `slot` and returns the area it covers.
    pub fn draw_image(&self, image: &DynamicImage, slot: Rect) -> Rect {
        let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
        let natural = estimated_image_size(&rgb, DEFAULT_IMAGE_DPI);
        let placed = fitted_rect(slot, natural);

        let scale_x = if natural.0 > f64::EPSILON {
            placed.width / natural.0
        } else {
            1.0
        };
        let scale_y = if natural.1 > f64::EPSILON {
            placed.height / natural.1
        } else {
            1.0
        };

        Image::from_dynamic_image(&rgb).add_to_layer(
            self.layer.clone(),
            Some(Mm(placed.x)),
            Some(Mm(self.page_height - placed.y - placed.height)),
            None,
            Some(scale_x),
            Some(scale_y),
            Some(DEFAULT_IMAGE_DPI),
        );
        placed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centred_text_is_symmetric() {
        let cell = Cell::new(Rect::new(10.0, 40.0, 190.0, 10.0), "Payslip")
            .with_align(TextAlign::Center);
        let width = fonts::text_width_mm("Payslip", FontStyle::Regular, 12.0);
        let left_gap = cell.text_x() - cell.rect.x;
        let right_gap = cell.rect.x + cell.rect.width - (cell.text_x() + width);
        assert!((left_gap - right_gap).abs() < 1e-9);
    }

    #[test]
    fn left_text_is_padded() {
        let cell = Cell::new(Rect::new(10.0, 80.0, 95.0, 10.0), "Pay Date: 2024-01-31");
        assert!((cell.text_x() - 11.0).abs() < 1e-9);
        assert!(cell.baseline_y() > 85.0 && cell.baseline_y() < 90.0);
    }

    #[test]
    fn fitted_rect_keeps_aspect_ratio() {
        let placed = fitted_rect(Rect::new(150.0, 10.0, 50.0, 0.0), (100.0, 40.0));
        assert!((placed.height - 20.0).abs() < 1e-9);

        let stretched = fitted_rect(Rect::full_page(), (100.0, 40.0));
        assert_eq!(stretched, Rect::full_page());
    }

    #[test]
    fn image_size_follows_dpi() {
        let image = DynamicImage::new_rgb8(300, 600);
        let (width, height) = estimated_image_size(&image, 300.0);
        assert!((width - 25.4).abs() < 1e-9);
        assert!((height - 50.8).abs() < 1e-9);
    }

    #[test]
    fn garbage_bytes_do_not_decode() {
        assert!(decode_image_from_bytes(b"definitely not an image").is_err());
    }
}
