// ============================================================================
// Document Layout
// ============================================================================
//
// Places every block of a quote or invoice on the page, top to bottom:
//
// 1. company identity (left) and title/client/metadata blocks (right)
// 2. the item table, which may run over several pages
// 3. totals, with the TTC amount in a highlighted box
// 4. payment terms and the signature line
//
// Each block is positioned at a fixed offset from a running cursor rather
// than at an absolute page position, so longer content pushes everything
// below it down. Wrapped fields advance the cursor by exactly
// `LINE_PITCH_MM * line_count`.

use crate::clock::{document_number, format_date_display};
use crate::error::Result;
use crate::metrics::{self, FontWeight, PT_TO_MM};
use crate::model::Document;
use crate::money::format_currency;
use crate::profile::CompanyProfile;
use crate::rows::{column_headers, Designation, RenderRow};
use crate::surface::{DrawingSurface, FillMode, RgbColor, TextAlign, LINE_HEIGHT_FACTOR};
use crate::table::{self, Cell, CellHooks, CellInput, Section, TableStyle, BASELINE_FACTOR};
use crate::totals::{Totals, VAT_RATE};
use ::image::DynamicImage;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;

// ============================================================================
// Constants
// ============================================================================

/// Page margins in mm
const MARGIN_LEFT_MM: f32 = 10.0;
const MARGIN_RIGHT_MM: f32 = 10.0;
const MARGIN_BOTTOM_MM: f32 = 15.0;
/// First baseline on the first page and on continuation pages
const HEADER_TOP_MM: f32 = 15.0;

/// Vertical distance between consecutive header/footer lines
pub const LINE_PITCH_MM: f32 = 6.0;

/// Logo box, top-left
const LOGO_WIDTH_MM: f32 = 40.0;
const LOGO_HEIGHT_MM: f32 = 20.0;

/// Right header column
const RIGHT_COLUMN_X_MM: f32 = 125.0;
pub const RIGHT_COLUMN_WIDTH_MM: f32 = 75.0;
const TITLE_BOX_HEIGHT_MM: f32 = 10.0;

/// Space between the header and the table
const TABLE_GAP_MM: f32 = 4.0;
/// Where totals start when the table reported no final position
const NO_TABLE_OFFSET_MM: f32 = 20.0;

/// Totals block offsets from the table's final y
const TOTAL_HT_OFFSET_MM: f32 = 10.0;
const VAT_OFFSET_MM: f32 = 16.0;
const TTC_BOX_OFFSET_MM: f32 = 20.0;
const TTC_BOX_OFFSET_NO_VAT_MM: f32 = 4.0;
const TTC_BOX_HEIGHT_MM: f32 = 9.0;
/// Deposit baseline below the TTC box
const DEPOSIT_GAP_MM: f32 = 7.0;
const TOTALS_LABEL_X_MM: f32 = 120.0;

/// Footer offsets from the last totals line
const FOOTER_OFFSET_MM: f32 = 14.0;
const PAYMENT_TERMS_WIDTH_MM: f32 = 105.0;
const SIGNATURE_X_MM: f32 = 140.0;
const SIGNATURE_SPACE_MM: f32 = 20.0;

/// Font sizes in points
const TITLE_FONT_SIZE: f32 = 13.0;
const HEADER_FONT_SIZE: f32 = 11.0;
const TABLE_FONT_SIZE: f32 = 10.0;
const TOTALS_FONT_SIZE: f32 = 11.0;
const FOOTER_FONT_SIZE: f32 = 10.0;

const HIGHLIGHT: RgbColor = RgbColor::gray(0.88);

// ============================================================================
// Input / Output
// ============================================================================

pub struct LayoutInput<'a> {
    pub document: &'a Document,
    pub totals: &'a Totals,
    pub rows: &'a [RenderRow],
    pub profile: &'a CompanyProfile,
    pub logo: Option<&'a DynamicImage>,
    /// Generation instant; drives the document number and printed date.
    pub now: NaiveDateTime,
}

/// Where the main blocks ended up, for callers and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutReport {
    pub document_number: String,
    pub header_bottom: f32,
    pub table_top: f32,
    pub table_final_y: Option<f32>,
    pub totals_top: f32,
    pub footer_bottom: f32,
    pub pages: usize,
    /// True when totals and footer were moved to a fresh page.
    pub footer_moved: bool,
    /// True when the header alone runs past the bottom margin of page 1.
    pub header_overflow: bool,
}

// ============================================================================
// Entry Point
// ============================================================================

pub fn render(surface: &mut dyn DrawingSurface, input: &LayoutInput) -> Result<LayoutReport> {
    let number = document_number(input.now);
    surface.set_text_color(RgbColor::BLACK);

    let left_bottom = draw_header_left(surface, input.profile, input.logo, HEADER_TOP_MM)?;
    let right_bottom = draw_header_right(surface, input, &number, HEADER_TOP_MM)?;
    let header_bottom = left_bottom.max(right_bottom);
    let (_, page_height) = surface.page_size();
    let header_overflow = header_bottom > page_height - MARGIN_BOTTOM_MM;
    if header_overflow {
        log::warn!(
            "header ends at y={:.1}mm, past the bottom margin of page 1; some header text is off the page",
            header_bottom
        );
    }

    let table_top = header_bottom + TABLE_GAP_MM;
    let table_final_y = draw_item_table(surface, input, table_top)?;
    let final_y = table_final_y.unwrap_or(header_bottom + NO_TABLE_OFFSET_MM);

    let (totals_top, footer_moved) = place_closing_blocks(surface, input, final_y)?;
    let totals_bottom = draw_totals(surface, input, totals_top)?;
    let footer_bottom = draw_footer(surface, input, totals_bottom)?;

    Ok(LayoutReport {
        document_number: number,
        header_bottom,
        table_top,
        table_final_y,
        totals_top,
        footer_bottom,
        pages: surface.page_count(),
        footer_moved,
        header_overflow,
    })
}

/// Draw `text` wrapped to `max_width`, one line per `LINE_PITCH_MM`, and
/// return the cursor for whatever comes next.
pub fn place_wrapped_field(
    surface: &mut dyn DrawingSurface,
    text: &str,
    x: f32,
    y: f32,
    max_width: f32,
) -> Result<f32> {
    let lines = surface.split_text_to_size(text, max_width);
    for (i, line) in lines.iter().enumerate() {
        surface.text(line, x, y + i as f32 * LINE_PITCH_MM, TextAlign::Left)?;
    }
    Ok(y + LINE_PITCH_MM * lines.len() as f32)
}

// ============================================================================
// Header
// ============================================================================

fn draw_header_left(
    surface: &mut dyn DrawingSurface,
    profile: &CompanyProfile,
    logo: Option<&DynamicImage>,
    start_y: f32,
) -> Result<f32> {
    let mut y = start_y;

    if let Some(logo) = logo {
        // Logo top aligns with the top of the first text line.
        let top = start_y - HEADER_FONT_SIZE * PT_TO_MM;
        surface.add_image(logo, MARGIN_LEFT_MM, top, LOGO_WIDTH_MM, LOGO_HEIGHT_MM)?;
        y = top + LOGO_HEIGHT_MM + LINE_PITCH_MM;
    }

    surface.set_font_size(HEADER_FONT_SIZE);
    for (i, line) in profile.identity_lines().iter().enumerate() {
        surface.set_font(if i == 0 { FontWeight::Bold } else { FontWeight::Normal });
        surface.text(line, MARGIN_LEFT_MM, y, TextAlign::Left)?;
        y += LINE_PITCH_MM;
    }
    surface.set_font(FontWeight::Normal);

    Ok(y)
}

fn draw_header_right(
    surface: &mut dyn DrawingSurface,
    input: &LayoutInput,
    number: &str,
    start_y: f32,
) -> Result<f32> {
    let x = RIGHT_COLUMN_X_MM;
    let width = RIGHT_COLUMN_WIDTH_MM;
    let document = input.document;

    // Title box
    let box_top = start_y - HEADER_FONT_SIZE * PT_TO_MM - 2.0;
    surface.rect(x, box_top, width, TITLE_BOX_HEIGHT_MM, FillMode::Fill(HIGHLIGHT))?;
    surface.set_font(FontWeight::Bold);
    surface.set_font_size(TITLE_FONT_SIZE);
    let title = format!("{} N° {}", document.kind.title(), number);
    let title_baseline = box_top + TITLE_BOX_HEIGHT_MM / 2.0 + TITLE_FONT_SIZE * PT_TO_MM * 0.35;
    surface.text(&title, x + width / 2.0, title_baseline, TextAlign::Center)?;

    let mut y = box_top + TITLE_BOX_HEIGHT_MM + LINE_PITCH_MM;

    // Client
    surface.set_font_size(HEADER_FONT_SIZE);
    surface.set_font(FontWeight::Bold);
    y = place_wrapped_field(surface, &format!("À : {}", document.client.name), x, y, width)?;
    surface.set_font(FontWeight::Normal);
    if !document.client.city.is_empty() {
        y = place_wrapped_field(surface, &document.client.city, x, y, width)?;
    }
    y += LINE_PITCH_MM / 2.0;

    // Metadata
    let fields = [
        format!("N° : {}", number),
        format!("Date : {}", format_date_display(input.now)),
        format!("Objet : {}", document.subject),
        format!("Adresse : {}", document.client.address),
    ];
    for field in &fields {
        y = place_wrapped_field(surface, field, x, y, width)?;
    }

    Ok(y)
}

// ============================================================================
// Item Table
// ============================================================================

/// First-column payload: the designation plus its wrapped lines, filled in
/// during the parse phase.
#[derive(Debug, Clone)]
struct DesignationCell {
    designation: Designation,
    title_lines: Vec<String>,
    description_lines: Vec<String>,
}

/// Draws the bold title and normal description in the first column. The
/// generic cell path leaves that column blank.
struct DesignationHooks {
    font_size: f32,
}

impl DesignationHooks {
    fn line_height(&self) -> f32 {
        metrics::line_height(self.font_size, LINE_HEIGHT_FACTOR)
    }
}

impl CellHooks<DesignationCell> for DesignationHooks {
    fn did_parse_cell(&mut self, surface: &mut dyn DrawingSurface, cell: &mut Cell<DesignationCell>) {
        if cell.section != Section::Body || cell.column_index != 0 {
            return;
        }
        let width = cell.content_width();
        let line_height = self.line_height();
        let padding = cell.padding;
        if let Some(meta) = cell.meta.as_mut() {
            surface.set_font_size(self.font_size);
            surface.set_font(FontWeight::Bold);
            meta.title_lines = surface.split_text_to_size(&meta.designation.title, width);
            surface.set_font(FontWeight::Normal);
            meta.description_lines = if meta.designation.description.trim().is_empty() {
                Vec::new()
            } else {
                surface.split_text_to_size(&meta.designation.description, width)
            };
            let lines = meta.title_lines.len() + meta.description_lines.len();
            cell.min_height = lines as f32 * line_height + 2.0 * padding;
        }
    }

    fn did_draw_cell(&mut self, surface: &mut dyn DrawingSurface, cell: &Cell<DesignationCell>) -> Result<()> {
        if cell.section != Section::Body || cell.column_index != 0 {
            return Ok(());
        }
        let Some(meta) = cell.meta.as_ref() else {
            return Ok(());
        };
        let line_height = self.line_height();
        let x = cell.x + cell.padding;
        let mut y = cell.y + cell.padding + self.font_size * PT_TO_MM * BASELINE_FACTOR;

        surface.set_font_size(self.font_size);
        surface.set_text_color(RgbColor::BLACK);
        surface.set_font(FontWeight::Bold);
        for line in &meta.title_lines {
            surface.text(line, x, y, TextAlign::Left)?;
            y += line_height;
        }
        surface.set_font(FontWeight::Normal);
        for line in &meta.description_lines {
            surface.text(line, x, y, TextAlign::Left)?;
            y += line_height;
        }
        // Leave the surface in the body font regardless of what was drawn.
        surface.set_font(FontWeight::Normal);
        Ok(())
    }
}

fn table_style(input: &LayoutInput) -> TableStyle {
    let (column_widths, column_align) = if input.document.kind.shows_unit_price() {
        (
            vec![None, Some(22.0), Some(38.0), Some(34.0)],
            vec![TextAlign::Left, TextAlign::Center, TextAlign::Right, TextAlign::Right],
        )
    } else {
        (
            vec![None, Some(25.0), Some(40.0)],
            vec![TextAlign::Left, TextAlign::Center, TextAlign::Right],
        )
    };
    let mut style = TableStyle {
        margin_left: MARGIN_LEFT_MM,
        margin_right: MARGIN_RIGHT_MM,
        margin_top: HEADER_TOP_MM,
        margin_bottom: MARGIN_BOTTOM_MM,
        column_widths,
        column_align,
        ..TableStyle::default()
    };
    style.head.font_size = TABLE_FONT_SIZE;
    style.body.font_size = TABLE_FONT_SIZE;
    style
}

fn draw_item_table(
    surface: &mut dyn DrawingSurface,
    input: &LayoutInput,
    start_y: f32,
) -> Result<Option<f32>> {
    let headers = column_headers(input.document.kind);
    let body: Vec<Vec<CellInput<DesignationCell>>> = input
        .rows
        .iter()
        .map(|row| {
            let mut cells = vec![
                CellInput::custom(DesignationCell {
                    designation: row.designation.clone(),
                    title_lines: Vec::new(),
                    description_lines: Vec::new(),
                }),
                CellInput::text(row.quantity.clone()),
            ];
            if let Some(unit_price) = &row.unit_price {
                cells.push(CellInput::text(unit_price.clone()));
            }
            cells.push(CellInput::text(row.total.clone()));
            cells
        })
        .collect();

    let style = table_style(input);
    let mut hooks = DesignationHooks {
        font_size: style.body.font_size,
    };
    let outcome = table::draw_table(surface, &headers, body, start_y, &style, &mut hooks)?;
    if outcome.page_breaks > 0 {
        log::info!("item table spans {} pages", outcome.page_breaks + 1);
    }
    Ok(outcome.final_y)
}

// ============================================================================
// Totals & Footer
// ============================================================================

fn vat_shown(input: &LayoutInput) -> bool {
    !input.document.flags.vat_exempt
}

/// Offset from the totals anchor to the deposit line.
fn totals_height(input: &LayoutInput) -> f32 {
    let box_offset = if vat_shown(input) {
        TTC_BOX_OFFSET_MM
    } else {
        TTC_BOX_OFFSET_NO_VAT_MM
    };
    box_offset + TTC_BOX_HEIGHT_MM + DEPOSIT_GAP_MM
}

fn payment_terms_lines(surface: &mut dyn DrawingSurface, profile: &CompanyProfile) -> Vec<String> {
    surface.set_font(FontWeight::Normal);
    surface.set_font_size(FOOTER_FONT_SIZE);
    profile
        .payment_terms
        .iter()
        .flat_map(|term| surface.split_text_to_size(term, PAYMENT_TERMS_WIDTH_MM))
        .collect()
}

fn footer_height(surface: &mut dyn DrawingSurface, profile: &CompanyProfile) -> f32 {
    let terms = payment_terms_lines(surface, profile).len() as f32 * LINE_PITCH_MM;
    FOOTER_OFFSET_MM + terms.max(SIGNATURE_SPACE_MM)
}

/// Decide where the totals block starts. Totals and footer are kept
/// together; when they would cross the bottom margin they move to a new page.
fn place_closing_blocks(
    surface: &mut dyn DrawingSurface,
    input: &LayoutInput,
    final_y: f32,
) -> Result<(f32, bool)> {
    let (_, page_height) = surface.page_size();
    let needed = totals_height(input) + footer_height(surface, input.profile);
    if final_y + needed <= page_height - MARGIN_BOTTOM_MM {
        return Ok((final_y, false));
    }
    log::warn!(
        "totals and footer need {:.1}mm below y={:.1}mm; moving them to a new page",
        needed,
        final_y
    );
    surface.add_page()?;
    // Anchor so the first totals line lands on the top margin.
    Ok((HEADER_TOP_MM - TOTAL_HT_OFFSET_MM, true))
}

fn draw_totals(surface: &mut dyn DrawingSurface, input: &LayoutInput, final_y: f32) -> Result<f32> {
    let (page_width, _) = surface.page_size();
    let amount_x = page_width - MARGIN_RIGHT_MM;
    let totals = input.totals;

    surface.set_font_size(TOTALS_FONT_SIZE);
    surface.set_font(FontWeight::Normal);
    surface.set_text_color(RgbColor::BLACK);

    let box_top = if vat_shown(input) {
        let ht_y = final_y + TOTAL_HT_OFFSET_MM;
        surface.text("Total HT :", TOTALS_LABEL_X_MM, ht_y, TextAlign::Left)?;
        surface.text(&format_currency(totals.total_ht), amount_x, ht_y, TextAlign::Right)?;

        let vat_y = final_y + VAT_OFFSET_MM;
        let vat_label = format!("TVA ({}%) :", (VAT_RATE * Decimal::ONE_HUNDRED).normalize());
        surface.text(&vat_label, TOTALS_LABEL_X_MM, vat_y, TextAlign::Left)?;
        surface.text(&format_currency(totals.vat), amount_x, vat_y, TextAlign::Right)?;

        final_y + TTC_BOX_OFFSET_MM
    } else {
        final_y + TTC_BOX_OFFSET_NO_VAT_MM
    };

    let box_x = TOTALS_LABEL_X_MM - 2.0;
    surface.rect(
        box_x,
        box_top,
        amount_x + 1.0 - box_x,
        TTC_BOX_HEIGHT_MM,
        FillMode::Fill(HIGHLIGHT),
    )?;
    surface.set_font(FontWeight::Bold);
    let ttc_y = box_top + TTC_BOX_HEIGHT_MM / 2.0 + TOTALS_FONT_SIZE * PT_TO_MM * 0.35;
    surface.text("Total TTC :", TOTALS_LABEL_X_MM, ttc_y, TextAlign::Left)?;
    surface.text(&format_currency(totals.total_ttc), amount_x, ttc_y, TextAlign::Right)?;
    surface.set_font(FontWeight::Normal);

    let deposit_y = box_top + TTC_BOX_HEIGHT_MM + DEPOSIT_GAP_MM;
    surface.text("Acompte :", TOTALS_LABEL_X_MM, deposit_y, TextAlign::Left)?;
    surface.text(&format_currency(totals.deposit_due), amount_x, deposit_y, TextAlign::Right)?;

    Ok(deposit_y)
}

fn draw_footer(surface: &mut dyn DrawingSurface, input: &LayoutInput, totals_bottom: f32) -> Result<f32> {
    let (page_width, _) = surface.page_size();
    let top = totals_bottom + FOOTER_OFFSET_MM;

    let terms = payment_terms_lines(surface, input.profile);
    let mut y = top;
    for line in &terms {
        surface.text(line, MARGIN_LEFT_MM, y, TextAlign::Left)?;
        y += LINE_PITCH_MM;
    }

    surface.set_font(FontWeight::Bold);
    surface.text(
        input.profile.signature_label(input.document.kind),
        SIGNATURE_X_MM,
        top,
        TextAlign::Left,
    )?;
    surface.set_font(FontWeight::Normal);

    let underline_y = top + SIGNATURE_SPACE_MM;
    surface.set_line_style(RgbColor::BLACK, 0.5);
    surface.line(SIGNATURE_X_MM, underline_y, page_width - MARGIN_RIGHT_MM, underline_y)?;

    Ok(y.max(underline_y))
}
