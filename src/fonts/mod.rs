//! Font selection and text metrics for the payslip renderer.
//!
//! Payslips use the standard Helvetica family that every PDF viewer ships, so no font files have
//! to be located or embedded. Because built-in fonts carry no metrics inside the document, the
//! advance widths from the Helvetica AFM files are kept here to centre text inside cells.

use printpdf::{BuiltinFont, IndirectFontRef, PdfDocumentReference};

const POINTS_PER_MM: f64 = 72.0 / 25.4;
const FALLBACK_WIDTH: u16 = 556;
/// Accented lowercase i glyphs are built on the dotless i in both faces.
const ACCENTED_I_WIDTH: u16 = 278;

/// Advance widths (1/1000 em) of Helvetica for the printable ASCII range `' '..='~'`.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

/// Advance widths (1/1000 em) of Helvetica-Bold for the printable ASCII range `' '..='~'`.
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // '0'..'?'
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // 'P'..'_'
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // '`'..'o'
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // 'p'..'~'
];

/// Style variants available within the family.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FontStyle {
    #[default]
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

impl FontStyle {
    fn builtin(self) -> BuiltinFont {
        match self {
            Self::Regular => BuiltinFont::Helvetica,
            Self::Bold => BuiltinFont::HelveticaBold,
            Self::Italic => BuiltinFont::HelveticaOblique,
            Self::BoldItalic => BuiltinFont::HelveticaBoldOblique,
        }
    }

    fn is_bold(self) -> bool {
        matches!(self, Self::Bold | Self::BoldItalic)
    }
}

/// The four faces of the family, registered with one document.
#[derive(Clone, Debug)]
pub struct FontFamily {
    pub regular: IndirectFontRef,
    pub bold: IndirectFontRef,
    pub italic: IndirectFontRef,
    pub bold_italic: IndirectFontRef,
}

impl FontFamily {
    /// Returns the face for `style`.
    pub fn get(&self, style: FontStyle) -> &IndirectFontRef {
        match style {
            FontStyle::Regular => &self.regular,
            FontStyle::Bold => &self.bold,
            FontStyle::Italic => &self.italic,
            FontStyle::BoldItalic => &self.bold_italic,
        }
    }
}

/// Adds the Helvetica family to the given document and returns the font references.
pub fn install_default_fonts(document: &PdfDocumentReference) -> Result<FontFamily, printpdf::Error> {
    Ok(FontFamily {
        regular: document.add_builtin_font(FontStyle::Regular.builtin())?,
        bold: document.add_builtin_font(FontStyle::Bold.builtin())?,
        italic: document.add_builtin_font(FontStyle::Italic.builtin())?,
        bold_italic: document.add_builtin_font(FontStyle::BoldItalic.builtin())?,
    })
}

fn glyph_width(ch: char, style: FontStyle) -> u16 {
    let table = if style.is_bold() {
        &HELVETICA_BOLD_WIDTHS
    } else {
        &HELVETICA_WIDTHS
    };
    match ch {
        ' '..='~' => table[(ch as usize) - (' ' as usize)],
        'ì'..='ï' => ACCENTED_I_WIDTH,
        _ => match base_letter(ch) {
            Some(base) => glyph_width(base, style),
            None => FALLBACK_WIDTH,
        },
    }
}

/// Latin-1 accented letters share the advance width of their unaccented letter.
fn base_letter(ch: char) -> Option<char> {
    let base = match ch {
        'À'..='Å' => 'A',
        'Ç' => 'C',
        'È'..='Ë' => 'E',
        'Ì'..='Ï' => 'I',
        'Ð' => 'D',
        'Ñ' => 'N',
        'Ò'..='Ö' | 'Ø' => 'O',
        'Ù'..='Ü' => 'U',
        'Ý' => 'Y',
        'à'..='å' => 'a',
        'ç' => 'c',
        'è'..='ë' => 'e',
        'ñ' => 'n',
        'ò'..='ö' => 'o',
        'ù'..='ü' => 'u',
        'ý' | 'ÿ' => 'y',
        _ => return None,
    };
    Some(base)
}

/// Width of `text` in millimetres when set in `style` at `size_pt` points.
///
/// Oblique faces share the metrics of their upright counterparts.
pub fn text_width_mm(text: &str, style: FontStyle, size_pt: f64) -> f64 {
    let units: u32 = text.chars().map(|ch| u32::from(glyph_width(ch, style))).sum();
    f64::from(units) / 1000.0 * size_pt / POINTS_PER_MM
}

/// Converts a font size in points to millimetres.
pub fn pt_to_mm(size_pt: f64) -> f64 {
    size_pt / POINTS_PER_MM
}
