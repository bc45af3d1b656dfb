//! Lazy decoding of an MDX result grid into output rows.
//!
//! Cells are visited page by page, row by row. Suppressed members drop whole pages, rows or
//! columns; renames and rounding are applied on the way out.

use crate::config::{ExtractOptions, HeaderStyle};
use crate::error::ExtractResult;
use crate::session::{Cell, GridAxis, ResultGrid};
use std::collections::{HashMap, HashSet, VecDeque};

/// Decoder settings taken from [`ExtractOptions`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecodeOptions {
    pub headers: HeaderStyle,
    pub suppress_zero_rows: bool,
    pub decimals: Option<u32>,
    suppressed: HashSet<String>,
    renames: HashMap<String, String>,
}

impl DecodeOptions {
    pub fn from_extract(options: &ExtractOptions) -> Self {
        Self {
            headers: options.headers,
            suppress_zero_rows: options.suppress_zero_rows,
            decimals: options.decimals,
            suppressed: options
                .suppressed_members
                .iter()
                .map(|m| m.to_ascii_uppercase())
                .collect(),
            renames: options
                .member_renames
                .iter()
                .map(|(from, to)| (from.to_ascii_uppercase(), to.clone()))
                .collect(),
        }
    }

    fn is_suppressed(&self, member: &str) -> bool {
        self.suppressed.contains(&member.to_ascii_uppercase())
    }

    fn rename(&self, member: String) -> String {
        match self.renames.get(&member.to_ascii_uppercase()) {
            Some(renamed) => renamed.clone(),
            None => member,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Field {
    Text(String),
    Number(f64),
    Missing,
    /// Header padding above the member columns.
    Blank,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowKind {
    Header,
    Data,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OutputRow {
    pub kind: RowKind,
    pub fields: Vec<Field>,
}

impl OutputRow {
    fn header(fields: Vec<Field>) -> Self {
        Self {
            kind: RowKind::Header,
            fields,
        }
    }
}

/// Tuple members of one grid axis.
#[derive(Debug)]
struct AxisLayout {
    dimensions: Vec<String>,
    /// Number of tuples; an axis without dimensions has one empty tuple.
    count: usize,
}

impl AxisLayout {
    fn read(grid: &dyn ResultGrid, axis: GridAxis) -> Self {
        let dimensions = grid.dimensions(axis);
        let count = if dimensions.is_empty() {
            1
        } else {
            grid.tuple_count(axis)
        };
        Self { dimensions, count }
    }

    fn members(
        &self,
        grid: &dyn ResultGrid,
        axis: GridAxis,
        tuple: usize,
    ) -> ExtractResult<Vec<String>> {
        let mut members = Vec::with_capacity(self.dimensions.len());
        for d in 0..self.dimensions.len() {
            members.push(grid.tuple_member(axis, tuple, d)?);
        }
        Ok(members)
    }
}

/// Iterator of header and data rows over one result grid.
pub struct ResultDecoder<'g> {
    grid: &'g dyn ResultGrid,
    options: &'g DecodeOptions,
    pages: AxisLayout,
    rows: AxisLayout,
    column_count: usize,
    /// Column tuples that survive suppression.
    kept_columns: Vec<usize>,
    /// Renamed member labels of the kept columns, one vector per column dimension.
    column_labels: Vec<Vec<String>>,
    page: usize,
    row: usize,
    page_members: Option<Vec<String>>,
    page_headers_written: bool,
    file_header_written: bool,
    /// Any header row emitted for this grid.
    headers_emitted: bool,
    pending: VecDeque<OutputRow>,
    records: usize,
    failed: bool,
}

impl<'g> ResultDecoder<'g> {
    pub fn new(grid: &'g dyn ResultGrid, options: &'g DecodeOptions) -> ExtractResult<Self> {
        let pages = AxisLayout::read(grid, GridAxis::Pages);
        let rows = AxisLayout::read(grid, GridAxis::Rows);
        let columns = AxisLayout::read(grid, GridAxis::Columns);

        let mut kept_columns = Vec::new();
        let mut column_labels = vec![Vec::new(); columns.dimensions.len()];
        for tuple in 0..columns.count {
            let members = columns.members(grid, GridAxis::Columns, tuple)?;
            if members.iter().any(|m| options.is_suppressed(m)) {
                continue;
            }
            kept_columns.push(tuple);
            for (labels, member) in column_labels.iter_mut().zip(members) {
                labels.push(options.rename(member));
            }
        }
        log::debug!(
            "decoding grid with {} pages, {} rows, {} of {} columns",
            pages.count,
            rows.count,
            kept_columns.len(),
            columns.count
        );

        Ok(Self {
            grid,
            options,
            pages,
            rows,
            column_count: columns.count,
            kept_columns,
            column_labels,
            page: 0,
            row: 0,
            page_members: None,
            page_headers_written: false,
            file_header_written: false,
            headers_emitted: false,
            pending: VecDeque::new(),
            records: 0,
            failed: false,
        })
    }

    /// Data rows produced so far.
    pub fn records(&self) -> usize {
        self.records
    }

    /// Whether this grid has produced a header row yet.
    pub fn headers_emitted(&self) -> bool {
        self.headers_emitted
    }

    fn header_rows(&mut self, page_members: &[String]) {
        let queued = self.pending.len();
        self.push_headers(page_members);
        self.headers_emitted |= self.pending.len() > queued;
    }

    fn push_headers(&mut self, page_members: &[String]) {
        let member_columns = self.pages.dimensions.len() + self.rows.dimensions.len();
        match self.options.headers {
            HeaderStyle::None => {}
            HeaderStyle::Grid => {
                if !page_members.is_empty() {
                    self.pending.push_back(OutputRow::header(
                        page_members.iter().cloned().map(Field::Text).collect(),
                    ));
                }
                for labels in &self.column_labels {
                    let mut fields = vec![Field::Blank; member_columns];
                    fields.extend(labels.iter().cloned().map(Field::Text));
                    self.pending.push_back(OutputRow::header(fields));
                }
            }
            HeaderStyle::File => {
                if self.file_header_written {
                    return;
                }
                self.file_header_written = true;
                let mut fields: Vec<Field> = self
                    .pages
                    .dimensions
                    .iter()
                    .chain(&self.rows.dimensions)
                    .cloned()
                    .map(Field::Text)
                    .collect();
                for (c, _) in self.kept_columns.iter().enumerate() {
                    let label = self
                        .column_labels
                        .iter()
                        .map(|labels| labels[c].as_str())
                        .collect::<Vec<_>>()
                        .join(":");
                    fields.push(Field::Text(label));
                }
                self.pending.push_back(OutputRow::header(fields));
            }
        }
    }

    /// Members of the current page, or `None` when the page is suppressed.
    fn enter_page(&mut self) -> ExtractResult<Option<Vec<String>>> {
        let members = self
            .pages
            .members(self.grid, GridAxis::Pages, self.page)?;
        if members.iter().any(|m| self.options.is_suppressed(m)) {
            return Ok(None);
        }
        Ok(Some(
            members.into_iter().map(|m| self.options.rename(m)).collect(),
        ))
    }

    fn decode_row(&self, page_members: &[String]) -> ExtractResult<Option<OutputRow>> {
        let members = self.rows.members(self.grid, GridAxis::Rows, self.row)?;
        if members.iter().any(|m| self.options.is_suppressed(m)) {
            return Ok(None);
        }

        let mut fields: Vec<Field> = page_members.iter().cloned().map(Field::Text).collect();
        fields.extend(
            members
                .into_iter()
                .map(|m| Field::Text(self.options.rename(m))),
        );

        let base = (self.page * self.rows.count + self.row) * self.column_count;
        let mut has_value = false;
        for &column in &self.kept_columns {
            match self.grid.cell(base + column)? {
                Cell::Value(value) => {
                    let value = match self.options.decimals {
                        Some(decimals) => round(value, decimals),
                        None => value,
                    };
                    has_value |= value != 0.0;
                    fields.push(Field::Number(value));
                }
                Cell::Missing => fields.push(Field::Missing),
            }
        }

        if self.options.suppress_zero_rows && !has_value {
            return Ok(None);
        }
        Ok(Some(OutputRow {
            kind: RowKind::Data,
            fields,
        }))
    }

    fn advance(&mut self) -> ExtractResult<Option<OutputRow>> {
        loop {
            if let Some(row) = self.pending.pop_front() {
                return Ok(Some(row));
            }
            if self.page >= self.pages.count {
                return Ok(None);
            }

            let page_members = match self.page_members.take() {
                Some(members) => members,
                None => match self.enter_page()? {
                    Some(members) => {
                        self.row = 0;
                        self.page_headers_written = false;
                        members
                    }
                    None => {
                        self.page += 1;
                        continue;
                    }
                },
            };

            if self.row >= self.rows.count {
                self.page += 1;
                continue;
            }

            let decoded = self.decode_row(&page_members);
            self.row += 1;
            if let Some(row) = decoded? {
                if !self.page_headers_written {
                    self.page_headers_written = true;
                    self.header_rows(&page_members);
                }
                self.records += 1;
                self.pending.push_back(row);
            }
            self.page_members = Some(page_members);
        }
    }
}

impl Iterator for ResultDecoder<'_> {
    type Item = ExtractResult<OutputRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.advance() {
            Ok(row) => row.map(Ok),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

pub(crate) fn round(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals.min(15) as i32);
    let rounded = (value * factor).round() / factor;
    // -0.0 prints with its sign.
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

#[cfg(test)]
mod tests {
    use super::round;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round(1.005_1, 2), 1.01);
        assert_eq!(round(-2.5, 0), -3.0);
        assert_eq!(round(1234.5678, 1), 1234.6);
        assert!(round(-0.001, 2).is_sign_positive());
    }
}
