//! Table detection.
//!
//! By default a table is a grid of ruling lines ([`TableStrategy::Lines`],
//! see the `ruling` module) and text is assigned to the cells it encloses.
//! [`TableStrategy::Text`] instead finds tables by alignment alone: spans
//! are grouped into rows, left edges that line up across rows become
//! columns, and runs of consecutive rows that fit those columns become
//! tables.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::model::{Table, TableRow};

use super::content::{PageContent, TextSpan};
use super::ruling::{self, Cell};
use super::text::spans_to_text;

/// X positions are bucketed to this many points when looking for edges.
const EDGE_BUCKET: f32 = 5.0;

/// A span starting within this distance of a column edge is aligned to it.
const ALIGN_TOLERANCE: f32 = 5.0;

/// Spans may start this far left of their column's edge.
const CELL_SLACK: f32 = 10.0;

/// How tables are recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableStrategy {
    /// Cells bounded by horizontal and vertical ruling lines
    #[default]
    Lines,
    /// Columns of aligned text, ignoring any lines
    Text,
}

/// Table detector configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDetectorConfig {
    /// Ruling lines or text alignment
    pub strategy: TableStrategy,
    /// Parallel ruling lines closer than this are merged (points)
    pub snap_tolerance: f32,
    /// Collinear pieces with gaps up to this are joined (points)
    pub join_tolerance: f32,
    /// Ruling lines shorter than this are ignored (points)
    pub edge_min_length: f32,
    /// Lines this close to crossing are treated as crossing (points)
    pub intersection_tolerance: f32,
    /// Minimum number of rows to consider as table
    pub min_rows: usize,
    /// Minimum number of columns to consider as table
    pub min_columns: usize,
    /// Maximum number of columns (above this, likely word-level splitting)
    pub max_columns: usize,
    /// Y tolerance for grouping spans into rows (fraction of font size)
    pub y_tolerance_factor: f32,
    /// Minimum fraction of a row's spans that must sit on column edges
    pub min_alignment_ratio: f32,
    /// Minimum gap between columns (points)
    pub min_column_gap: f32,
}

impl TableDetectorConfig {
    /// Defaults with a different strategy.
    pub fn with_strategy(strategy: TableStrategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }
}

impl Default for TableDetectorConfig {
    fn default() -> Self {
        Self {
            strategy: TableStrategy::Lines,
            snap_tolerance: 3.0,
            join_tolerance: 3.0,
            edge_min_length: 3.0,
            intersection_tolerance: 3.0,
            min_rows: 2,
            min_columns: 2,
            max_columns: 6,
            y_tolerance_factor: 0.4,
            min_alignment_ratio: 0.3,
            min_column_gap: 15.0,
        }
    }
}

/// A row of spans sharing a baseline.
#[derive(Debug, Clone)]
pub(crate) struct SpanRow {
    /// Spans in this row, sorted by X
    pub(crate) spans: Vec<TextSpan>,
}

/// A table region before it is turned into cells.
#[derive(Debug, Clone)]
pub(crate) struct DetectedTable {
    /// Column left edges, ascending
    pub(crate) columns: Vec<f32>,
    /// Right edge of the widest span
    pub(crate) right_x: f32,
    /// Rows, top to bottom
    pub(crate) rows: Vec<SpanRow>,
}

/// Detects tables by text alignment.
#[derive(Debug, Clone, Default)]
pub(crate) struct TableDetector {
    config: TableDetectorConfig,
}

impl TableDetector {
    /// Create a detector with custom thresholds.
    pub(crate) fn with_config(config: TableDetectorConfig) -> Self {
        Self { config }
    }

    /// Find table regions, top of the page first.
    pub(crate) fn detect(&self, spans: &[TextSpan]) -> Vec<DetectedTable> {
        let cfg = &self.config;

        if spans.len() < cfg.min_rows * cfg.min_columns {
            log::debug!("TableDetector: only {} spans, skipping", spans.len());
            return vec![];
        }

        let rows = self.group_into_rows(spans);
        if rows.len() < cfg.min_rows {
            return vec![];
        }

        let columns = self.detect_columns(&rows);
        log::debug!(
            "TableDetector: {} rows, candidate columns at {:?}",
            rows.len(),
            columns
        );
        if columns.len() < cfg.min_columns {
            return vec![];
        }

        let mut tables = Vec::new();
        for (start, end) in self.find_regions(&rows, &columns) {
            let region = rows[start..=end].to_vec();

            // Columns are re-detected per region; a page-wide guess can
            // include edges that only other regions use.
            let region_columns = self.detect_columns(&region);
            if region_columns.len() < cfg.min_columns {
                continue;
            }
            if region_columns.len() > cfg.max_columns {
                log::debug!(
                    "TableDetector: rows {}..={} have {} columns, treating as prose",
                    start,
                    end,
                    region_columns.len()
                );
                continue;
            }
            if is_list_pattern(&region, &region_columns) {
                log::debug!("TableDetector: rows {}..={} look like a list", start, end);
                continue;
            }

            let right_x = region
                .iter()
                .flat_map(|r| r.spans.iter())
                .map(TextSpan::right)
                .fold(f32::MIN, f32::max);

            tables.push(DetectedTable {
                columns: region_columns,
                right_x,
                rows: region,
            });
        }

        tables
    }

    /// Turn a detected region into rows of cells.
    pub(crate) fn to_table(&self, detected: &DetectedTable) -> Table {
        let mut table = Table::new();

        for row in &detected.rows {
            let mut cells: Vec<Vec<&str>> = vec![Vec::new(); detected.columns.len()];
            for span in &row.spans {
                let col = find_column(span.x, &detected.columns, detected.right_x);
                cells[col].push(span.text.trim());
            }

            table.add_row(TableRow::new(
                cells
                    .into_iter()
                    .map(|parts| {
                        let text = parts
                            .into_iter()
                            .filter(|p| !p.is_empty())
                            .collect::<Vec<_>>()
                            .join(" ");
                        (!text.is_empty()).then_some(text)
                    })
                    .collect(),
            ));
        }

        table
    }

    fn group_into_rows(&self, spans: &[TextSpan]) -> Vec<SpanRow> {
        let mut sorted = spans.to_vec();
        sorted.sort_by(|a, b| match b.y.partial_cmp(&a.y).unwrap_or(Ordering::Equal) {
            Ordering::Equal => a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal),
            other => other,
        });

        let mut rows: Vec<SpanRow> = Vec::new();
        let mut current: Vec<TextSpan> = Vec::new();
        let mut current_y: Option<f32> = None;

        for span in sorted {
            let tolerance = span.font_size * self.config.y_tolerance_factor;
            match current_y {
                Some(y) if (span.y - y).abs() <= tolerance => current.push(span),
                _ => {
                    if !current.is_empty() {
                        rows.push(SpanRow {
                            spans: std::mem::take(&mut current),
                        });
                    }
                    current_y = Some(span.y);
                    current.push(span);
                }
            }
        }

        if !current.is_empty() {
            rows.push(SpanRow { spans: current });
        }

        rows
    }

    /// Left edges shared by enough rows, merged when closer than the
    /// minimum column gap.
    fn detect_columns(&self, rows: &[SpanRow]) -> Vec<f32> {
        let multi_span: Vec<&SpanRow> = rows.iter().filter(|r| r.spans.len() >= 2).collect();

        // With few multi-span rows every row votes, and a row may vote for
        // the same edge more than once.
        let (voters, dedupe_per_row): (Vec<&SpanRow>, bool) =
            if multi_span.len() >= self.config.min_rows {
                (multi_span, true)
            } else {
                (rows.iter().collect(), false)
            };

        if voters.is_empty() {
            return vec![];
        }

        let mut edge_counts: HashMap<i32, usize> = HashMap::new();
        for row in &voters {
            let mut seen = HashSet::new();
            for span in &row.spans {
                let bucket = (span.x / EDGE_BUCKET).round() as i32;
                if !dedupe_per_row || seen.insert(bucket) {
                    *edge_counts.entry(bucket).or_insert(0) += 1;
                }
            }
        }

        let min_occurrences =
            ((voters.len() as f32 * self.config.min_alignment_ratio) as usize).max(2);

        let mut edges: Vec<f32> = edge_counts
            .into_iter()
            .filter(|(_, count)| *count >= min_occurrences)
            .map(|(bucket, _)| bucket as f32 * EDGE_BUCKET)
            .collect();
        edges.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

        let mut merged: Vec<f32> = Vec::new();
        for edge in edges {
            match merged.last() {
                Some(last) if edge - last < self.config.min_column_gap => {}
                _ => merged.push(edge),
            }
        }
        merged
    }

    /// Runs of consecutive well-aligned rows, as inclusive index ranges.
    fn find_regions(&self, rows: &[SpanRow], columns: &[f32]) -> Vec<(usize, usize)> {
        let mut regions = Vec::new();
        let mut start: Option<usize> = None;

        for (i, row) in rows.iter().enumerate() {
            if alignment_score(row, columns) >= self.config.min_alignment_ratio {
                start.get_or_insert(i);
            } else if let Some(s) = start.take() {
                if i - s >= self.config.min_rows {
                    regions.push((s, i - 1));
                }
            }
        }

        if let Some(s) = start {
            if rows.len() - s >= self.config.min_rows {
                regions.push((s, rows.len() - 1));
            }
        }

        regions
    }
}

#[derive(Debug)]
enum Region {
    Aligned(DetectedTable),
    Ruled(Vec<Cell>),
}

/// Tables on a page, converted to cells as they are pulled.
#[derive(Debug)]
pub struct Tables {
    detector: TableDetector,
    spans: Vec<TextSpan>,
    regions: std::vec::IntoIter<Region>,
}

impl Tables {
    /// Find table regions on a page; cells are filled on iteration.
    pub fn detect(content: &PageContent, config: &TableDetectorConfig) -> Self {
        let detector = TableDetector::with_config(config.clone());
        let (regions, spans): (Vec<Region>, Vec<TextSpan>) = match config.strategy {
            TableStrategy::Lines => (
                ruling::find_tables(&content.edges, config)
                    .into_iter()
                    .map(Region::Ruled)
                    .collect(),
                content.spans.clone(),
            ),
            TableStrategy::Text => (
                detector
                    .detect(&content.spans)
                    .into_iter()
                    .map(Region::Aligned)
                    .collect(),
                Vec::new(),
            ),
        };
        Self {
            detector,
            spans,
            regions: regions.into_iter(),
        }
    }
}

impl Iterator for Tables {
    type Item = Table;

    fn next(&mut self) -> Option<Table> {
        Some(match self.regions.next()? {
            Region::Aligned(region) => self.detector.to_table(&region),
            Region::Ruled(cells) => ruled_table(&cells, &self.spans),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.regions.size_hint()
    }
}

impl ExactSizeIterator for Tables {}

/// Lay ruled cells out as rows (by top edge) and columns (by left edge).
/// A grid position without a cell, or a cell without text, is `None`.
fn ruled_table(cells: &[Cell], spans: &[TextSpan]) -> Table {
    let mut xs: Vec<f32> = cells.iter().map(|c| c.x0).collect();
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    xs.dedup();

    let mut tops: Vec<f32> = cells.iter().map(|c| c.top).collect();
    tops.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));
    tops.dedup();

    let mut table = Table::new();
    for top in tops {
        let row = xs
            .iter()
            .map(|&x0| {
                cells
                    .iter()
                    .find(|c| c.top == top && c.x0 == x0)
                    .and_then(|cell| cell_text(cell, spans))
            })
            .collect();
        table.add_row(TableRow::new(row));
    }
    table
}

/// A span belongs to the cell holding a point just inside its start,
/// a quarter of the font size above the baseline.
fn cell_text(cell: &Cell, spans: &[TextSpan]) -> Option<String> {
    let inside: Vec<TextSpan> = spans
        .iter()
        .filter(|s| cell.contains(s.x + 0.5, s.y + s.font_size * 0.25))
        .cloned()
        .collect();
    spans_to_text(&inside).filter(|text| !text.trim().is_empty())
}

fn alignment_score(row: &SpanRow, columns: &[f32]) -> f32 {
    if row.spans.is_empty() || columns.is_empty() {
        return 0.0;
    }

    let aligned = row
        .spans
        .iter()
        .filter(|s| columns.iter().any(|c| (s.x - c).abs() <= ALIGN_TOLERANCE))
        .count();

    aligned as f32 / row.spans.len() as f32
}

fn find_column(x: f32, columns: &[f32], right_x: f32) -> usize {
    for (i, &start) in columns.iter().enumerate() {
        let end = columns.get(i + 1).copied().unwrap_or(right_x + 100.0);
        if x >= start - CELL_SLACK && x < end - CELL_SLACK {
            return i;
        }
    }

    columns
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            (x - **a)
                .abs()
                .partial_cmp(&(x - **b).abs())
                .unwrap_or(Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Numbered and bulleted lists put the marker and the item in separate
/// spans, which otherwise looks exactly like a two-column table.
fn is_list_pattern(rows: &[SpanRow], columns: &[f32]) -> bool {
    if columns.len() < 2 || rows.is_empty() {
        return false;
    }

    let mut bullets = 0;
    let mut numbers = 0;
    for row in rows {
        if let Some(first) = row.spans.first() {
            let text = first.text.trim();
            if is_bullet_marker(text) {
                bullets += 1;
            } else if is_number_marker(text) {
                numbers += 1;
            }
        }
    }

    let total = rows.len() as f32;
    if bullets as f32 / total >= 0.5 {
        return true;
    }

    columns.len() == 2 && (bullets + numbers) as f32 / total >= 0.5
}

fn is_bullet_marker(text: &str) -> bool {
    matches!(
        text.trim(),
        "-" | "–" | "—" | "•" | "·" | "*" | "○" | "▪" | "◦" | "▸" | "▹" | "►" | "■" | "●" | "□"
            | "◆" | "◇" | "▶" | "▷" | "➤" | "➜"
    )
}

/// "1.", "12)", "3", "a.", "B)"
fn is_number_marker(text: &str) -> bool {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return false;
    }

    if cleaned.parse::<u32>().is_ok() {
        return true;
    }

    let Some(body) = cleaned
        .strip_suffix('.')
        .or_else(|| cleaned.strip_suffix(')'))
    else {
        return false;
    };

    (!body.is_empty() && body.chars().all(|c| c.is_ascii_digit()))
        || (body.chars().count() == 1 && body.chars().all(char::is_alphabetic))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ruling::Edge;

    fn span(text: &str, x: f32, y: f32) -> TextSpan {
        TextSpan::new(text, x, y, 12.0)
    }

    fn grid(rows: &[(&[&str], f32)], xs: &[f32]) -> Vec<TextSpan> {
        rows.iter()
            .flat_map(|(cells, y)| {
                cells
                    .iter()
                    .zip(xs)
                    .filter(|(text, _)| !text.is_empty())
                    .map(move |(text, x)| span(text, *x, *y))
            })
            .collect()
    }

    #[test]
    fn test_group_into_rows() {
        let detector = TableDetector::default();
        let spans = vec![
            span("A1", 10.0, 100.0),
            span("B1", 60.0, 100.0),
            span("A2", 10.0, 85.0),
            span("B2", 60.0, 85.0),
        ];

        let rows = detector.group_into_rows(&spans);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].spans[0].text, "A1");
        assert_eq!(rows[1].spans[1].text, "B2");
    }

    #[test]
    fn test_detect_simple_table() {
        let detector = TableDetector::default();
        let spans = grid(
            &[
                (&["Name", "Age"], 100.0),
                (&["Alice", "30"], 85.0),
                (&["Bob", "25"], 70.0),
            ],
            &[10.0, 60.0],
        );

        let tables = detector.detect(&spans);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].columns.len(), 2);

        let table = detector.to_table(&tables[0]);
        assert_eq!(table.rows[0], TableRow::from_strings(["Name", "Age"]));
        assert_eq!(table.rows[1], TableRow::from_strings(["Alice", "30"]));
        assert_eq!(table.rows[2], TableRow::from_strings(["Bob", "25"]));
    }

    #[test]
    fn test_empty_cell_is_none() {
        let detector = TableDetector::default();
        let spans = grid(
            &[
                (&["Mineral", "Hardness", "Luster"], 300.0),
                (&["Quartz", "7", "Glassy"], 280.0),
                (&["Talc", "", "Pearly"], 260.0),
                (&["Gypsum", "2", ""], 240.0),
            ],
            &[72.0, 200.0, 320.0],
        );

        let tables = detector.detect(&spans);
        assert_eq!(tables.len(), 1);

        let table = detector.to_table(&tables[0]);
        assert_eq!(table.row_count(), 4);
        assert_eq!(
            table.rows[2].cells,
            vec![Some("Talc".to_string()), None, Some("Pearly".to_string())]
        );
        assert_eq!(
            table.rows[3].cells,
            vec![Some("Gypsum".to_string()), Some("2".to_string()), None]
        );
    }

    #[test]
    fn test_two_tables_split_by_prose() {
        let detector = TableDetector::default();
        let mut spans = grid(
            &[(&["Era", "Age"], 700.0), (&["Jurassic", "201"], 680.0)],
            &[72.0, 200.0],
        );
        spans.push(span("Ages in millions of years", 300.0, 640.0));
        spans.extend(grid(
            &[(&["City", "Zip"], 600.0), (&["Oslo", "0150"], 580.0)],
            &[72.0, 200.0],
        ));

        let tables = detector.detect(&spans);
        assert_eq!(tables.len(), 2);
        assert_eq!(
            detector.to_table(&tables[0]).rows[1],
            TableRow::from_strings(["Jurassic", "201"])
        );
        assert_eq!(
            detector.to_table(&tables[1]).rows[0],
            TableRow::from_strings(["City", "Zip"])
        );
    }

    #[test]
    fn test_no_table_single_column() {
        let detector = TableDetector::default();
        let spans = vec![
            span("Line 1", 10.0, 100.0),
            span("Line 2", 10.0, 85.0),
            span("Line 3", 10.0, 70.0),
            span("Line 4", 10.0, 55.0),
        ];

        assert!(detector.detect(&spans).is_empty());
    }

    #[test]
    fn test_numbered_list_not_detected_as_table() {
        let detector = TableDetector::default();
        let spans = grid(
            &[
                (&["1.", "Igneous"], 400.0),
                (&["2.", "Sedimentary"], 370.0),
                (&["3.", "Metamorphic"], 340.0),
            ],
            &[50.0, 80.0],
        );

        assert!(detector.detect(&spans).is_empty());
    }

    #[test]
    fn test_bullet_list_not_detected_as_table() {
        let detector = TableDetector::default();
        let spans = grid(
            &[
                (&["•", "Weathering"], 400.0),
                (&["•", "Erosion"], 370.0),
                (&["•", "Deposition"], 340.0),
            ],
            &[50.0, 80.0],
        );

        assert!(detector.detect(&spans).is_empty());
    }

    #[test]
    fn test_text_strategy_tables_iterator() {
        let content = PageContent {
            spans: grid(
                &[(&["Rock", "Type"], 300.0), (&["Basalt", "Igneous"], 280.0)],
                &[72.0, 200.0],
            ),
            ..Default::default()
        };

        let config = TableDetectorConfig::with_strategy(TableStrategy::Text);
        let mut tables = Tables::detect(&content, &config);
        assert_eq!(tables.len(), 1);
        let table = tables.next().unwrap();
        assert_eq!(table.rows[1].cell(1), Some("Igneous"));
        assert!(tables.next().is_none());
    }

    /// Ruling lines around a grid of cells: columns at `xs`, rows at `ys`
    /// (top first).
    fn ruling(xs: &[f32], ys: &[f32]) -> Vec<Edge> {
        let (left, right) = (xs[0], xs[xs.len() - 1]);
        let (top, bottom) = (ys[0], ys[ys.len() - 1]);
        ys.iter()
            .filter_map(|&y| Edge::from_segment((left, y), (right, y)))
            .chain(
                xs.iter()
                    .filter_map(|&x| Edge::from_segment((x, bottom), (x, top))),
            )
            .collect()
    }

    #[test]
    fn test_ruled_table_cells() {
        let mut spans = grid(
            &[
                (&["Mineral", "Hardness"], 505.0),
                (&["Quartz", "7"], 485.0),
                (&["Talc", ""], 465.0),
            ],
            &[80.0, 210.0],
        );
        spans.push(span("Mohs scale", 80.0, 420.0));
        let content = PageContent {
            spans,
            edges: ruling(&[72.0, 200.0, 330.0], &[520.0, 500.0, 480.0, 460.0]),
            image_count: 0,
        };

        let tables: Vec<_> = Tables::detect(&content, &TableDetectorConfig::default()).collect();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].row_count(), 3);
        assert_eq!(tables[0].rows[0], TableRow::from_strings(["Mineral", "Hardness"]));
        assert_eq!(tables[0].rows[1], TableRow::from_strings(["Quartz", "7"]));
        assert_eq!(tables[0].rows[2].cells, vec![Some("Talc".to_string()), None]);
    }

    #[test]
    fn test_ruled_cell_joins_wrapped_lines() {
        let content = PageContent {
            spans: vec![
                span("Igneous", 80.0, 505.0),
                span("Formed from", 210.0, 505.0),
                span("cooled magma", 210.0, 490.0),
            ],
            edges: ruling(&[72.0, 200.0, 330.0], &[520.0, 480.0]),
            image_count: 0,
        };

        let table = Tables::detect(&content, &TableDetectorConfig::default())
            .next()
            .unwrap();
        assert_eq!(
            table.rows[0],
            TableRow::from_strings(["Igneous", "Formed from\ncooled magma"])
        );
    }

    #[test]
    fn test_aligned_text_without_lines_is_not_a_table() {
        let content = PageContent {
            spans: grid(
                &[
                    (&["Igneous", "Formed from cooled magma"], 400.0),
                    (&["Sedimentary", "Formed from deposits"], 380.0),
                ],
                &[72.0, 300.0],
            ),
            ..Default::default()
        };

        assert_eq!(
            Tables::detect(&content, &TableDetectorConfig::default()).len(),
            0
        );
        assert_eq!(
            Tables::detect(
                &content,
                &TableDetectorConfig::with_strategy(TableStrategy::Text)
            )
            .len(),
            1
        );
    }

    #[test]
    fn test_boxed_text_is_not_a_table() {
        let content = PageContent {
            spans: vec![span("Key idea", 90.0, 300.0)],
            edges: ruling(&[72.0, 400.0], &[340.0, 260.0]),
            image_count: 0,
        };

        assert_eq!(
            Tables::detect(&content, &TableDetectorConfig::default()).len(),
            0
        );
    }

    #[test]
    fn test_markers() {
        assert!(is_number_marker("1."));
        assert!(is_number_marker("12."));
        assert!(is_number_marker("1)"));
        assert!(is_number_marker("1 ."));
        assert!(is_number_marker("3"));
        assert!(is_number_marker("a."));
        assert!(is_number_marker("B)"));
        assert!(is_bullet_marker("•"));
        assert!(is_bullet_marker("-"));

        assert!(!is_number_marker("Name"));
        assert!(!is_number_marker("ab."));
        assert!(!is_number_marker(""));
        assert!(!is_number_marker("地质"));
        assert!(!is_bullet_marker("Alice"));
    }
}
