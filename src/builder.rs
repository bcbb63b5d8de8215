//! Turning a payslip record into a finished PDF document.

use std::fs;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::DynamicImage;
use log::{debug, warn};
use printpdf::{Mm, PdfDocument};
use thiserror::Error;

use crate::assets::{Asset, BrandingAssets};
use crate::elements::{self, Painter, Rect, PAGE_HEIGHT_MM, PAGE_WIDTH_MM};
use crate::fonts;
use crate::layout::{self, LayoutOptions, LOGO_SLOT};
use crate::model::PayslipRecord;

const LAYER_NAME: &str = "Payslip";
const FILENAME_SUFFIX: &str = "_payslip.pdf";
const FALLBACK_STEM: &str = "employee";

/// Errors raised while producing a payslip document.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("PDF backend error: {0}")]
    Pdf(#[from] printpdf::Error),
    #[error("failed to write payslip: {0}")]
    Io(#[from] io::Error),
}

/// A finished payslip document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedPayslip {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl RenderedPayslip {
    /// The document as a `data:` URI, usable as a download link.
    pub fn data_uri(&self) -> String {
        format!("data:application/pdf;base64,{}", STANDARD.encode(&self.bytes))
    }

    /// Writes the document into `dir` under its filename and returns the full path.
    pub fn write_to_dir(&self, dir: impl AsRef<Path>) -> io::Result<PathBuf> {
        let path = dir.as_ref().join(&self.filename);
        fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// Derives `<name>_payslip.pdf`, with whitespace and path separators replaced by `_`.
///
/// An empty name falls back to the employee ID, then to `employee`.
pub fn payslip_filename(record: &PayslipRecord) -> String {
    format!("{}{}", filename_stem(record), FILENAME_SUFFIX)
}

/// Filenames to try when [`payslip_filename`] is already taken by another record:
/// `<name>_<id>_payslip.pdf`, then `<name>_<id>_2_payslip.pdf`, `_3` and so on.
pub fn alternate_filenames(record: &PayslipRecord) -> impl Iterator<Item = String> {
    let stem = filename_stem(record);
    let id = sanitize(record.employee_id().trim());
    let base = if id.is_empty() || id == stem {
        stem
    } else {
        format!("{}_{}", stem, id)
    };
    (1u32..).map(move |n| match n {
        1 => format!("{}{}", base, FILENAME_SUFFIX),
        n => format!("{}_{}{}", base, n, FILENAME_SUFFIX),
    })
}

fn filename_stem(record: &PayslipRecord) -> String {
    let stem = [record.employee_name(), record.employee_id()]
        .into_iter()
        .map(str::trim)
        .find(|candidate| !candidate.is_empty())
        .unwrap_or(FALLBACK_STEM);
    sanitize(stem)
}

fn sanitize(stem: &str) -> String {
    stem.chars()
        .map(|ch| {
            if ch.is_whitespace() || ch == '/' || ch == '\\' {
                '_'
            } else {
                ch
            }
        })
        .collect()
}

/// Renders payslips with a fixed layout and configurable title, footer and markers.
#[derive(Clone, Debug, Default)]
pub struct DocumentBuilder {
    layout: LayoutOptions,
    unavailable_marker: bool,
}

impl DocumentBuilder {
    /// Creates a builder with the default title and footer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the title shown in the top band.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.layout.title = title.into();
        self
    }

    /// Sets the footer disclaimer; `None` leaves the footer out.
    pub fn with_footer(mut self, footer: Option<String>) -> Self {
        self.layout.footer = footer;
        self
    }

    /// Shows "Logo unavailable" in the logo slot when the logo cannot be drawn.
    pub fn with_unavailable_marker(mut self, enabled: bool) -> Self {
        self.unavailable_marker = enabled;
        self
    }

    /// Returns the layout options in use.
    pub fn layout_options(&self) -> &LayoutOptions {
        &self.layout
    }

    /// Renders `record` onto a single A4 page.
    ///
    /// Missing or undecodable images are skipped; they never fail the render.
    pub fn render(
        &self,
        record: &PayslipRecord,
        assets: &BrandingAssets,
    ) -> Result<RenderedPayslip, RenderError> {
        let filename = payslip_filename(record);
        let (doc, page, layer) = PdfDocument::new(
            format!("Payslip - {}", record.employee_name()),
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            LAYER_NAME,
        );
        let family = fonts::install_default_fonts(&doc)?;
        let painter = Painter::new(doc.get_page(page).get_layer(layer), &family);

        if let Some(letterhead) = decode(&assets.letterhead, "letterhead") {
            painter.draw_image(&letterhead, Rect::full_page());
        }

        match decode(&assets.logo, "logo") {
            Some(logo) => {
                painter.draw_image(&logo, LOGO_SLOT);
            }
            None if self.unavailable_marker => painter.draw_cell(&layout::logo_unavailable_marker()),
            None => {}
        }

        for cell in &layout::layout_payslip(record, &self.layout).cells {
            painter.draw_cell(cell);
        }

        let mut writer = BufWriter::new(Vec::new());
        doc.save(&mut writer)?;
        let bytes = writer.into_inner().map_err(|err| err.into_error())?;
        debug!("rendered {} ({} bytes)", filename, bytes.len());

        Ok(RenderedPayslip { filename, bytes })
    }
}

fn decode(asset: &Asset, what: &str) -> Option<DynamicImage> {
    match asset {
        Asset::Available(bytes) => match elements::decode_image_from_bytes(bytes) {
            Ok(image) => Some(image),
            Err(err) => {
                warn!("{} could not be decoded, leaving it out: {}", what, err);
                None
            }
        },
        Asset::Unavailable { reason } => {
            debug!("{} unavailable: {}", what, reason);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PeriodFields;
    use chrono::NaiveDate;

    fn period() -> PeriodFields {
        PeriodFields::new(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(), 22, "Acme", "Lagos")
    }

    fn named(name: &str, id: &str) -> PayslipRecord {
        PayslipRecord::builder(period())
            .employee_name(name)
            .employee_id(id)
            .build()
            .unwrap()
    }

    #[test]
    fn filename_replaces_whitespace() {
        assert_eq!(payslip_filename(&named("James Arthur", "0077")), "James_Arthur_payslip.pdf");
        assert_eq!(payslip_filename(&named("Ada\tLove lace", "1")), "Ada_Love_lace_payslip.pdf");
    }

    #[test]
    fn filename_strips_path_separators() {
        assert_eq!(payslip_filename(&named("../etc/passwd", "1")), ".._etc_passwd_payslip.pdf");
        assert_eq!(payslip_filename(&named("a\\b", "1")), "a_b_payslip.pdf");
    }

    #[test]
    fn filename_falls_back_to_id_then_default() {
        assert_eq!(payslip_filename(&named("  ", "0077")), "0077_payslip.pdf");
        assert_eq!(payslip_filename(&named("", "")), "employee_payslip.pdf");
    }

    #[test]
    fn alternate_filenames_add_id_then_counter() {
        let names: Vec<_> = alternate_filenames(&named("James Arthur", "0099")).take(3).collect();
        assert_eq!(
            names,
            vec![
                "James_Arthur_0099_payslip.pdf",
                "James_Arthur_0099_2_payslip.pdf",
                "James_Arthur_0099_3_payslip.pdf",
            ]
        );

        let names: Vec<_> = alternate_filenames(&named("", "0077")).take(2).collect();
        assert_eq!(names, vec!["0077_payslip.pdf", "0077_2_payslip.pdf"]);
    }

    #[test]
    fn data_uri_is_base64_pdf() {
        let rendered = RenderedPayslip {
            filename: "x_payslip.pdf".to_owned(),
            bytes: b"%PDF".to_vec(),
        };
        assert_eq!(rendered.data_uri(), "data:application/pdf;base64,JVBERg==");
    }

    #[test]
    fn render_produces_pdf_bytes() {
        let rendered = DocumentBuilder::new()
            .render(&named("James Arthur", "0077"), &BrandingAssets::none())
            .unwrap();
        assert_eq!(rendered.filename, "James_Arthur_payslip.pdf");
        assert!(rendered.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn builder_options_reach_layout() {
        let builder = DocumentBuilder::new()
            .with_title("Pay Advice")
            .with_footer(None)
            .with_unavailable_marker(true);
        assert_eq!(builder.layout_options().title, "Pay Advice");
        assert!(builder.layout_options().footer.is_none());
    }
}
