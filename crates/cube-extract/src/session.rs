//! Query capabilities of a native cube session.
//!
//! These traits declare only what extraction needs from the engine binding. A session is used by one
//! logical thread at a time; concurrent extracts need separate sessions.

use cube_outline::{MemberSource, NativeResult};
use std::fmt;
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueryDialect {
    Mdx,
    CalcScript,
    ReportScript,
}

impl fmt::Display for QueryDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QueryDialect::Mdx => "MDX",
            QueryDialect::CalcScript => "calc script",
            QueryDialect::ReportScript => "report script",
        })
    }
}

/// What the engine hands back for a submitted query.
pub enum QueryResponse {
    /// An open result grid; must be closed once decoded.
    Grid(Box<dyn ResultGrid>),
    /// Report-script output text.
    Report(String),
    /// The query ran for its side effects (e.g. a calc-script data export).
    Completed,
}

impl QueryResponse {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            QueryResponse::Grid(_) => "grid",
            QueryResponse::Report(_) => "report",
            QueryResponse::Completed => "empty",
        }
    }
}

impl fmt::Debug for QueryResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryResponse::Grid(_) => f.write_str("Grid(..)"),
            QueryResponse::Report(text) => f.debug_tuple("Report").field(&text.len()).finish(),
            QueryResponse::Completed => f.write_str("Completed"),
        }
    }
}

pub trait CubeSession: MemberSource {
    /// `Application.Database` of the connected cube.
    fn cube_name(&self) -> String;

    fn submit_query(&mut self, dialect: QueryDialect, text: &str) -> NativeResult<QueryResponse>;

    /// Copy a file the engine wrote on the server side to `local_path`.
    fn copy_from_server(&mut self, server_file: &str, local_path: &Path) -> NativeResult<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GridAxis {
    Slicer,
    Columns,
    Rows,
    Pages,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Cell {
    Value(f64),
    Missing,
}

/// A result grid returned by an MDX query.
///
/// Cells are addressed by ordinal: `column + columns * (row + rows * page)`, where an axis with no
/// dimensions counts as a single tuple.
pub trait ResultGrid {
    fn dimensions(&self, axis: GridAxis) -> Vec<String>;
    fn tuple_count(&self, axis: GridAxis) -> usize;
    fn tuple_member(&self, axis: GridAxis, tuple: usize, dimension: usize) -> NativeResult<String>;
    fn cell(&self, ordinal: usize) -> NativeResult<Cell>;
    fn close(&mut self) -> NativeResult<()>;
}

/// Owns an open grid and closes it when dropped, so error paths release the handle as well.
pub struct GridGuard {
    grid: Option<Box<dyn ResultGrid>>,
}

impl GridGuard {
    pub fn new(grid: Box<dyn ResultGrid>) -> Self {
        Self { grid: Some(grid) }
    }

    pub fn grid(&self) -> &dyn ResultGrid {
        match &self.grid {
            Some(grid) => grid.as_ref(),
            None => unreachable!("grid is only taken by close or drop"),
        }
    }

    /// Close now and report the engine's answer instead of only logging it.
    pub fn close(mut self) -> NativeResult<()> {
        match self.grid.take() {
            Some(mut grid) => grid.close(),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for GridGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridGuard")
            .field("open", &self.grid.is_some())
            .finish()
    }
}

impl Drop for GridGuard {
    fn drop(&mut self) {
        if let Some(mut grid) = self.grid.take() {
            if let Err(err) = grid.close() {
                log::warn!("failed to close result grid: {err}");
            }
        }
    }
}
