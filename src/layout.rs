//! The fixed payslip layout.
//!
//! [`layout_payslip`] is a pure function from a record to the list of cells that make up the
//! page, so the arrangement can be inspected without producing a PDF. Geometry follows an A4 page
//! with 10 mm margins and 10 mm rows, starting 40 mm from the top to leave room for the logo.

use crate::currency::format_amount;
use crate::elements::{Cell, Rect, Rgb8, TextAlign, PAGE_HEIGHT_MM, PAGE_WIDTH_MM};
use crate::fonts::FontStyle;
use crate::model::PayslipRecord;

pub const MARGIN_MM: f64 = 10.0;
pub const ROW_HEIGHT_MM: f64 = 10.0;
pub const CONTENT_TOP_MM: f64 = 40.0;
pub const FULL_WIDTH_MM: f64 = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;
pub const LEFT_COLUMN_MM: f64 = 95.0;
pub const DETAILS_RIGHT_COLUMN_MM: f64 = 95.0;
pub const RIGHT_COLUMN_MM: f64 = 90.0;
pub const FOOTER_FROM_BOTTOM_MM: f64 = 30.0;

/// Logo slot in the top-right corner; the height follows the image's aspect ratio.
pub const LOGO_SLOT: Rect = Rect::new(150.0, 10.0, 50.0, 0.0);

/// Text shown in the logo slot when the logo could not be loaded and markers are enabled.
pub const LOGO_UNAVAILABLE_TEXT: &str = "Logo unavailable";

pub const DEFAULT_TITLE: &str = "Payslip";
pub const DEFAULT_FOOTER: &str =
    "This payslip is computer generated and does not require a physical signature.";

pub const TITLE_FILL: Rgb8 = Rgb8(255, 165, 0);
pub const COMPANY_FILL: Rgb8 = Rgb8(0, 174, 239);
pub const ADDRESS_FILL: Rgb8 = Rgb8(135, 206, 250);
pub const SECTION_HEADER_FILL: Rgb8 = Rgb8(135, 206, 250);
pub const TOTAL_EARNINGS_FILL: Rgb8 = Rgb8(144, 238, 144);
pub const TOTAL_DEDUCTIONS_FILL: Rgb8 = Rgb8(255, 182, 193);
pub const NET_PAY_FILL: Rgb8 = Rgb8(173, 216, 230);

/// Texts that vary between deployments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayoutOptions {
    pub title: String,
    pub footer: Option<String>,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_owned(),
            footer: Some(DEFAULT_FOOTER.to_owned()),
        }
    }
}

/// Every cell of one payslip page, in painting order.
#[derive(Clone, Debug, PartialEq)]
pub struct PageLayout {
    pub cells: Vec<Cell>,
}

impl PageLayout {
    /// Finds the first cell whose text starts with `prefix`.
    pub fn find(&self, prefix: &str) -> Option<&Cell> {
        self.cells.iter().find(|cell| cell.text.starts_with(prefix))
    }
}

struct Cursor {
    y: f64,
    cells: Vec<Cell>,
}

impl Cursor {
    fn new(y: f64) -> Self {
        Self {
            y,
            cells: Vec::new(),
        }
    }

    fn band(&mut self, text: &str, fill: Rgb8) {
        self.cells.push(
            Cell::new(Rect::new(MARGIN_MM, self.y, FULL_WIDTH_MM, ROW_HEIGHT_MM), text)
                .with_align(TextAlign::Center)
                .with_fill(fill),
        );
        self.y += ROW_HEIGHT_MM;
    }

    fn left(&mut self, cell: Cell) {
        self.cells.push(cell);
    }

    fn rect(&self, column: Column) -> Rect {
        match column {
            Column::Left => Rect::new(MARGIN_MM, self.y, LEFT_COLUMN_MM, ROW_HEIGHT_MM),
            Column::DetailsRight => Rect::new(
                MARGIN_MM + LEFT_COLUMN_MM,
                self.y,
                DETAILS_RIGHT_COLUMN_MM,
                ROW_HEIGHT_MM,
            ),
            Column::Right => Rect::new(
                MARGIN_MM + LEFT_COLUMN_MM,
                self.y,
                RIGHT_COLUMN_MM,
                ROW_HEIGHT_MM,
            ),
        }
    }

    fn newline(&mut self) {
        self.y += ROW_HEIGHT_MM;
    }
}

#[derive(Clone, Copy)]
enum Column {
    Left,
    DetailsRight,
    Right,
}

fn amount_line(label: &str, amount: rust_decimal::Decimal) -> String {
    format!("{}: {}", label, format_amount(amount))
}

/// Lays out the payslip for `record`.
pub fn layout_payslip(record: &PayslipRecord, options: &LayoutOptions) -> PageLayout {
    let earnings = record.earnings();
    let deductions = record.deductions();
    let mut cursor = Cursor::new(CONTENT_TOP_MM);

    cursor.band(&options.title, TITLE_FILL);
    cursor.band(record.company_name(), COMPANY_FILL);
    cursor.band(record.company_address(), ADDRESS_FILL);
    cursor.newline();

    let details = [
        (
            format!("Pay Date: {}", record.pay_date_label()),
            format!("Employee Name: {}", record.employee_name()),
        ),
        (
            format!("Working Days: {}", record.working_days()),
            format!("Employee ID: {}", record.employee_id()),
        ),
    ];
    for (left, right) in details {
        cursor.left(Cell::new(cursor.rect(Column::Left), left));
        cursor.left(Cell::new(cursor.rect(Column::DetailsRight), right).with_style(FontStyle::Bold));
        cursor.newline();
    }
    cursor.newline();

    cursor.left(Cell::new(cursor.rect(Column::Left), "Earnings").with_fill(SECTION_HEADER_FILL));
    cursor.left(Cell::new(cursor.rect(Column::Right), "Deductions").with_fill(SECTION_HEADER_FILL));
    cursor.newline();

    let earning_lines = [
        amount_line("Basic Pay", earnings.basic_pay),
        amount_line("Housing", earnings.housing),
        amount_line("Transport", earnings.transport),
        amount_line("Other Allowances", earnings.other_allowances),
    ];
    let deduction_lines = [
        amount_line("Tax", deductions.tax),
        amount_line("Pension (Employee)", deductions.employee_pension),
        amount_line("Other Deductions", deductions.other_deductions),
    ];
    for (index, earning) in earning_lines.into_iter().enumerate() {
        cursor.left(Cell::new(cursor.rect(Column::Left), earning));
        if let Some(deduction) = deduction_lines.get(index) {
            cursor.left(Cell::new(cursor.rect(Column::Right), deduction.as_str()));
        }
        cursor.newline();
    }

    cursor.left(
        Cell::new(
            cursor.rect(Column::Left),
            amount_line("Total Earnings", record.total_earnings()),
        )
        .with_style(FontStyle::Bold)
        .with_fill(TOTAL_EARNINGS_FILL),
    );
    cursor.left(
        Cell::new(
            cursor.rect(Column::Right),
            amount_line("Total Deductions", record.total_deductions()),
        )
        .with_style(FontStyle::Bold)
        .with_fill(TOTAL_DEDUCTIONS_FILL),
    );
    cursor.newline();

    cursor.left(
        Cell::new(cursor.rect(Column::Left), amount_line("Net Pay", record.net_pay()))
            .with_style(FontStyle::Bold)
            .with_fill(NET_PAY_FILL),
    );

    if let Some(footer) = options.footer.as_deref().filter(|text| !text.trim().is_empty()) {
        cursor.cells.push(
            Cell::new(
                Rect::new(
                    MARGIN_MM,
                    PAGE_HEIGHT_MM - FOOTER_FROM_BOTTOM_MM,
                    FULL_WIDTH_MM,
                    ROW_HEIGHT_MM,
                ),
                footer,
            )
            .with_align(TextAlign::Center)
            .with_style(FontStyle::Italic)
            .with_font_size(10.0)
            .with_border(false),
        );
    }

    PageLayout {
        cells: cursor.cells,
    }
}

/// The marker cell drawn in the logo slot when the logo is missing.
pub fn logo_unavailable_marker() -> Cell {
    Cell::new(
        Rect::new(LOGO_SLOT.x, LOGO_SLOT.y, LOGO_SLOT.width, ROW_HEIGHT_MM),
        LOGO_UNAVAILABLE_TEXT,
    )
    .with_align(TextAlign::Center)
    .with_style(FontStyle::Italic)
    .with_font_size(8.0)
    .with_border(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PeriodFields;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn record() -> PayslipRecord {
        let period = PeriodFields::new(
            NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
            30,
            "Salmnine Investment Ltd",
            "FF Millennium Towers, Ligali Ayorinde, VI, Lagos",
        );
        PayslipRecord::builder(period)
            .employee_name("James Arthur")
            .employee_id("0077")
            .basic_pay(dec!(400000))
            .housing(dec!(200000))
            .transport(dec!(150000))
            .other_allowances(dec!(25000))
            .tax(dec!(100000))
            .employee_pension(dec!(57000))
            .build()
            .unwrap()
    }

    #[test]
    fn header_bands_span_full_width() {
        let layout = layout_payslip(&record(), &LayoutOptions::default());
        let title = &layout.cells[0];
        assert_eq!(title.text, "Payslip");
        assert_eq!(title.rect, Rect::new(10.0, 40.0, 190.0, 10.0));
        assert_eq!(title.fill, Some(TITLE_FILL));
        assert_eq!(layout.cells[1].text, "Salmnine Investment Ltd");
        assert_eq!(layout.cells[2].rect.y, 60.0);
        assert_eq!(layout.cells[2].fill, Some(ADDRESS_FILL));
    }

    #[test]
    fn details_pair_date_with_name() {
        let layout = layout_payslip(&record(), &LayoutOptions::default());
        let date = layout.find("Pay Date:").unwrap();
        let name = layout.find("Employee Name:").unwrap();
        assert_eq!(date.text, "Pay Date: 2024-05-31");
        assert_eq!(date.rect.y, name.rect.y);
        assert_eq!(name.style, FontStyle::Bold);

        let days = layout.find("Working Days:").unwrap();
        let id = layout.find("Employee ID:").unwrap();
        assert_eq!(days.text, "Working Days: 30");
        assert_eq!(id.text, "Employee ID: 0077");
        assert_eq!(days.rect.y, date.rect.y + ROW_HEIGHT_MM);
    }

    #[test]
    fn earnings_pair_with_deductions_and_extra_line_stands_alone() {
        let layout = layout_payslip(&record(), &LayoutOptions::default());
        let basic = layout.find("Basic Pay:").unwrap();
        let tax = layout.find("Tax:").unwrap();
        assert_eq!(basic.text, "Basic Pay: 400,000.00");
        assert_eq!(tax.text, "Tax: 100,000.00");
        assert_eq!(basic.rect.y, tax.rect.y);

        let other = layout.find("Other Allowances:").unwrap();
        assert_eq!(other.rect.x, MARGIN_MM);
        let beside_other = layout
            .cells
            .iter()
            .filter(|cell| cell.rect.y == other.rect.y && cell.rect.x > MARGIN_MM)
            .count();
        assert_eq!(beside_other, 0);
    }

    #[test]
    fn totals_and_net_pay_are_emphasised() {
        let layout = layout_payslip(&record(), &LayoutOptions::default());
        let earnings = layout.find("Total Earnings:").unwrap();
        let deductions = layout.find("Total Deductions:").unwrap();
        let net = layout.find("Net Pay:").unwrap();

        assert_eq!(earnings.text, "Total Earnings: 775,000.00");
        assert_eq!(deductions.text, "Total Deductions: 157,000.00");
        assert_eq!(net.text, "Net Pay: 618,000.00");
        assert_eq!(earnings.fill, Some(TOTAL_EARNINGS_FILL));
        assert_eq!(deductions.fill, Some(TOTAL_DEDUCTIONS_FILL));
        assert_eq!(net.fill, Some(NET_PAY_FILL));
        assert!(net.rect.y > earnings.rect.y);
        assert_eq!(earnings.rect.y, 160.0);
    }

    #[test]
    fn footer_is_optional() {
        let with_footer = layout_payslip(&record(), &LayoutOptions::default());
        let footer = with_footer.cells.last().unwrap();
        assert_eq!(footer.text, DEFAULT_FOOTER);
        assert!(!footer.border);
        assert_eq!(footer.rect.y, 267.0);

        let options = LayoutOptions {
            footer: None,
            ..LayoutOptions::default()
        };
        let without = layout_payslip(&record(), &options);
        assert_eq!(without.cells.len(), with_footer.cells.len() - 1);
        assert!(without.find(DEFAULT_FOOTER).is_none());
    }
}
