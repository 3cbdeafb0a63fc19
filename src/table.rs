// ============================================================================
// Table Layout
// ============================================================================
//
// Draws a header row and a body of rows below a starting y, breaking onto
// new pages when a row does not fit. Rows are never split: a row that does
// not fit moves to the next page, where the header is repeated.
//
// Callers customise cells through two hook phases:
// - `did_parse_cell` runs once per cell after its text has been wrapped and
//   before row heights are fixed. It may replace the text or reserve extra
//   height.
// - `did_draw_cell` runs after the generic path has painted the cell, with
//   the cell's final bounding box filled in.
//
// Both hooks receive the surface explicitly. After each `did_draw_cell`
// the table restores its own font, size and colour, so whatever a hook
// leaves behind never leaks into the next cell.

use crate::error::Result;
use crate::metrics::{FontWeight, PT_TO_MM};
use crate::surface::{DrawingSurface, FillMode, RgbColor, TextAlign};

/// Distance from the top of a cell's content box to the first baseline, as
/// a multiple of the font size.
pub const BASELINE_FACTOR: f32 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Head,
    Body,
}

#[derive(Debug, Clone)]
pub struct SectionStyle {
    pub fill: Option<RgbColor>,
    pub text_color: RgbColor,
    pub font_size: f32,
    pub weight: FontWeight,
}

#[derive(Debug, Clone)]
pub struct TableStyle {
    pub margin_left: f32,
    pub margin_right: f32,
    /// Where rows start on continuation pages.
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub cell_padding: f32,
    pub min_cell_height: f32,
    pub line_color: RgbColor,
    pub line_width: f32,
    pub head: SectionStyle,
    pub body: SectionStyle,
    /// Fixed widths per column; `None` columns share what is left.
    pub column_widths: Vec<Option<f32>>,
    pub column_align: Vec<TextAlign>,
}

impl Default for TableStyle {
    fn default() -> Self {
        TableStyle {
            margin_left: 10.0,
            margin_right: 10.0,
            margin_top: 15.0,
            margin_bottom: 15.0,
            cell_padding: 2.0,
            min_cell_height: 8.0,
            line_color: RgbColor::gray(0.6),
            line_width: 0.3,
            head: SectionStyle {
                fill: Some(RgbColor::gray(0.25)),
                text_color: RgbColor::WHITE,
                font_size: 10.0,
                weight: FontWeight::Bold,
            },
            body: SectionStyle {
                fill: None,
                text_color: RgbColor::BLACK,
                font_size: 10.0,
                weight: FontWeight::Normal,
            },
            column_widths: Vec::new(),
            column_align: Vec::new(),
        }
    }
}

impl TableStyle {
    fn section(&self, section: Section) -> &SectionStyle {
        match section {
            Section::Head => &self.head,
            Section::Body => &self.body,
        }
    }

    fn align(&self, column: usize) -> TextAlign {
        self.column_align.get(column).copied().unwrap_or(TextAlign::Left)
    }
}

/// Input for one body cell: the text the generic path prints, plus optional
/// data the hooks can use.
#[derive(Debug, Clone)]
pub struct CellInput<M> {
    pub content: String,
    pub meta: Option<M>,
}

impl<M> CellInput<M> {
    pub fn text(content: impl Into<String>) -> Self {
        CellInput {
            content: content.into(),
            meta: None,
        }
    }

    /// A cell the generic path leaves blank; its content comes from hooks.
    pub fn custom(meta: M) -> Self {
        CellInput {
            content: String::new(),
            meta: Some(meta),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Cell<M> {
    pub section: Section,
    pub row_index: usize,
    pub column_index: usize,
    /// Wrapped lines painted by the generic path.
    pub text: Vec<String>,
    pub meta: Option<M>,
    /// Minimum height requested by a hook. The row uses the larger of this
    /// and the height of `text`.
    pub min_height: f32,
    pub align: TextAlign,
    pub padding: f32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl<M> Cell<M> {
    /// Width available for content once padding is removed.
    pub fn content_width(&self) -> f32 {
        (self.width - 2.0 * self.padding).max(0.0)
    }
}

pub trait CellHooks<M> {
    fn did_parse_cell(&mut self, _surface: &mut dyn DrawingSurface, _cell: &mut Cell<M>) {}

    fn did_draw_cell(&mut self, _surface: &mut dyn DrawingSurface, _cell: &Cell<M>) -> Result<()> {
        Ok(())
    }
}

/// Hooks that do nothing.
pub struct NoHooks;

impl<M> CellHooks<M> for NoHooks {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableOutcome {
    /// y just below the last drawn row; `None` when no body row was drawn.
    pub final_y: Option<f32>,
    pub page_breaks: usize,
}

/// Resolve column widths: fixed overrides first, the rest split evenly.
pub fn resolve_column_widths(overrides: &[Option<f32>], columns: usize, table_width: f32) -> Vec<f32> {
    let fixed: f32 = (0..columns)
        .filter_map(|i| overrides.get(i).copied().flatten())
        .sum();
    let auto_count = (0..columns)
        .filter(|i| overrides.get(*i).copied().flatten().is_none())
        .count();
    let auto_width = if auto_count > 0 {
        ((table_width - fixed) / auto_count as f32).max(0.0)
    } else {
        0.0
    };
    (0..columns)
        .map(|i| overrides.get(i).copied().flatten().unwrap_or(auto_width))
        .collect()
}

fn parse_cell<M>(
    surface: &mut dyn DrawingSurface,
    hooks: &mut dyn CellHooks<M>,
    style: &TableStyle,
    section: Section,
    row_index: usize,
    column_index: usize,
    width: f32,
    input: CellInput<M>,
) -> Cell<M> {
    let section_style = style.section(section);
    surface.set_font(section_style.weight);
    surface.set_font_size(section_style.font_size);

    let content_width = (width - 2.0 * style.cell_padding).max(0.0);
    let text = if input.content.is_empty() {
        Vec::new()
    } else {
        surface.split_text_to_size(&input.content, content_width)
    };
    let mut cell = Cell {
        section,
        row_index,
        column_index,
        text,
        meta: input.meta,
        min_height: 0.0,
        align: style.align(column_index),
        padding: style.cell_padding,
        x: 0.0,
        y: 0.0,
        width,
        height: 0.0,
    };
    hooks.did_parse_cell(surface, &mut cell);

    // The hook may have touched the font; measure with the section's.
    surface.set_font(section_style.weight);
    surface.set_font_size(section_style.font_size);
    let text_height = cell.text.len() as f32 * surface.line_height() + 2.0 * style.cell_padding;
    cell.height = style.min_cell_height.max(cell.min_height).max(text_height);
    cell
}

fn row_height<M>(cells: &[Cell<M>]) -> f32 {
    cells.iter().map(|c| c.height).fold(0.0, f32::max)
}

fn draw_row<M>(
    surface: &mut dyn DrawingSurface,
    hooks: &mut dyn CellHooks<M>,
    style: &TableStyle,
    cells: &mut [Cell<M>],
    y: f32,
    height: f32,
) -> Result<()> {
    let mut x = style.margin_left;
    for cell in cells.iter_mut() {
        cell.x = x;
        cell.y = y;
        cell.height = height;
        x += cell.width;

        let section_style = style.section(cell.section);
        surface.set_line_style(style.line_color, style.line_width);
        let mode = match section_style.fill {
            Some(color) => FillMode::FillStroke(color),
            None => FillMode::Stroke,
        };
        surface.rect(cell.x, cell.y, cell.width, cell.height, mode)?;

        surface.set_font(section_style.weight);
        surface.set_font_size(section_style.font_size);
        surface.set_text_color(section_style.text_color);
        let line_height = surface.line_height();
        let first_baseline = cell.y + cell.padding + section_style.font_size * PT_TO_MM * BASELINE_FACTOR;
        let anchor_x = match cell.align {
            TextAlign::Left => cell.x + cell.padding,
            TextAlign::Right => cell.x + cell.width - cell.padding,
            TextAlign::Center => cell.x + cell.width / 2.0,
        };
        for (i, line) in cell.text.iter().enumerate() {
            surface.text(line, anchor_x, first_baseline + i as f32 * line_height, cell.align)?;
        }

        hooks.did_draw_cell(surface, cell)?;

        surface.set_font(section_style.weight);
        surface.set_font_size(section_style.font_size);
        surface.set_text_color(section_style.text_color);
    }
    Ok(())
}

/// Draw `head` and `body` starting at `start_y`.
pub fn draw_table<M>(
    surface: &mut dyn DrawingSurface,
    head: &[&str],
    body: Vec<Vec<CellInput<M>>>,
    start_y: f32,
    style: &TableStyle,
    hooks: &mut dyn CellHooks<M>,
) -> Result<TableOutcome> {
    let (page_width, page_height) = surface.page_size();
    let saved_weight = surface.font();
    let saved_size = surface.font_size();

    if body.is_empty() {
        return Ok(TableOutcome {
            final_y: None,
            page_breaks: 0,
        });
    }

    let columns = head.len().max(body.iter().map(Vec::len).max().unwrap_or(0));
    let table_width = page_width - style.margin_left - style.margin_right;
    let widths = resolve_column_widths(&style.column_widths, columns, table_width);

    let mut head_cells: Vec<Cell<M>> = (0..columns)
        .map(|i| {
            let content = head.get(i).copied().unwrap_or("");
            parse_cell(surface, hooks, style, Section::Head, 0, i, widths[i], CellInput::text(content))
        })
        .collect();
    let head_height = row_height(&head_cells);

    let mut rows: Vec<Vec<Cell<M>>> = body
        .into_iter()
        .enumerate()
        .map(|(row_index, inputs)| {
            let mut inputs = inputs.into_iter();
            (0..columns)
                .map(|i| {
                    let input = inputs.next().unwrap_or_else(|| CellInput::text(""));
                    parse_cell(surface, hooks, style, Section::Body, row_index, i, widths[i], input)
                })
                .collect()
        })
        .collect();

    let limit = page_height - style.margin_bottom;
    let mut y = start_y;
    let mut page_breaks = 0;

    // Header and first row stay together.
    let first_height = row_height(&rows[0]);
    if y + head_height + first_height > limit && y > style.margin_top {
        surface.add_page()?;
        page_breaks += 1;
        y = style.margin_top;
    }
    draw_row(surface, hooks, style, &mut head_cells, y, head_height)?;
    y += head_height;

    let mut rows_on_page = 0;
    for cells in rows.iter_mut() {
        let height = row_height(cells);
        if y + height > limit && rows_on_page > 0 {
            surface.add_page()?;
            page_breaks += 1;
            log::info!(
                "table continues on page {} at row {}",
                surface.page_count(),
                cells.first().map(|c| c.row_index).unwrap_or(0)
            );
            y = style.margin_top;
            draw_row(surface, hooks, style, &mut head_cells, y, head_height)?;
            y += head_height;
            rows_on_page = 0;
        }
        draw_row(surface, hooks, style, cells, y, height)?;
        y += height;
        rows_on_page += 1;
    }

    surface.set_font(saved_weight);
    surface.set_font_size(saved_size);
    surface.set_text_color(RgbColor::BLACK);

    Ok(TableOutcome {
        final_y: Some(y),
        page_breaks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{DrawOp, RecordingSurface};

    // Tall enough that one line of 10pt text never exceeds it.
    fn style() -> TableStyle {
        TableStyle {
            min_cell_height: 10.0,
            ..TableStyle::default()
        }
    }

    fn body(rows: usize) -> Vec<Vec<CellInput<()>>> {
        (0..rows)
            .map(|i| vec![CellInput::text(format!("Ligne {}", i)), CellInput::text("1 u")])
            .collect()
    }

    #[test]
    fn test_column_widths_share_remaining_space() {
        let widths = resolve_column_widths(&[None, Some(30.0), None], 3, 190.0);
        assert_eq!(widths, vec![80.0, 30.0, 80.0]);
    }

    #[test]
    fn test_empty_body_has_no_final_y() {
        let mut surface = RecordingSurface::a4();
        let outcome = draw_table(
            &mut surface,
            &["A", "B"],
            Vec::<Vec<CellInput<()>>>::new(),
            50.0,
            &TableStyle::default(),
            &mut NoHooks,
        )
        .unwrap();
        assert_eq!(outcome.final_y, None);
        assert!(surface.ops.is_empty());
    }

    #[test]
    fn test_rows_stack_below_start() {
        let mut surface = RecordingSurface::a4();
        let style = style();
        let outcome = draw_table(&mut surface, &["A", "B"], body(3), 50.0, &style, &mut NoHooks).unwrap();
        // header + 3 rows, each at the minimum height
        let expected = 50.0 + 4.0 * style.min_cell_height;
        assert!((outcome.final_y.unwrap() - expected).abs() < 1e-3);
        assert_eq!(outcome.page_breaks, 0);
    }

    #[test]
    fn test_overflow_moves_rows_to_new_page_with_header() {
        let mut surface = RecordingSurface::a4();
        let style = style();
        let outcome = draw_table(&mut surface, &["A", "B"], body(60), 50.0, &style, &mut NoHooks).unwrap();
        assert!(outcome.page_breaks >= 1);
        assert_eq!(surface.page_count(), 1 + outcome.page_breaks);

        let header_pages: Vec<usize> = surface
            .texts()
            .into_iter()
            .filter(|t| t.1 == "A")
            .map(|t| t.0)
            .collect();
        assert_eq!(header_pages.len(), surface.page_count());

        let (_, page_height) = surface.page_size();
        for op in &surface.ops {
            if let DrawOp::Rect { y, h, .. } = op {
                assert!(y + h <= page_height - style.margin_bottom + 1e-3);
            }
        }
    }

    struct TallCells {
        drawn: Vec<(usize, f32, f32)>,
    }

    impl CellHooks<&'static str> for TallCells {
        fn did_parse_cell(&mut self, _surface: &mut dyn DrawingSurface, cell: &mut Cell<&'static str>) {
            if cell.meta.is_some() {
                cell.min_height = 20.0;
            }
        }

        fn did_draw_cell(&mut self, surface: &mut dyn DrawingSurface, cell: &Cell<&'static str>) -> Result<()> {
            if let Some(label) = cell.meta {
                surface.set_font(FontWeight::Bold);
                surface.text(label, cell.x + cell.padding, cell.y + 5.0, TextAlign::Left)?;
                self.drawn.push((cell.row_index, cell.y, cell.height));
            }
            Ok(())
        }
    }

    #[test]
    fn test_hooks_size_and_draw_custom_cells() {
        let mut surface = RecordingSurface::a4();
        let rows = vec![
            vec![CellInput::custom("Titre"), CellInput::text("x")],
            vec![CellInput::custom("Autre"), CellInput::text("y")],
        ];
        let mut hooks = TallCells { drawn: Vec::new() };
        let outcome =
            draw_table(&mut surface, &["A", "B"], rows, 40.0, &style(), &mut hooks).unwrap();

        assert_eq!(hooks.drawn.len(), 2);
        assert!((hooks.drawn[0].2 - 20.0).abs() < 1e-3);
        assert!((hooks.drawn[1].1 - (hooks.drawn[0].1 + 20.0)).abs() < 1e-3);
        assert!((outcome.final_y.unwrap() - (40.0 + 10.0 + 40.0)).abs() < 1e-3);

        // The cell after a hook that switched to bold is painted normal again.
        let y_text = surface.find_text("y").unwrap();
        assert_eq!(y_text.4, FontWeight::Normal);
    }
}
