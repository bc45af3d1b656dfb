#![allow(dead_code)]

use cube_extract::{Cell as GridCell, CubeSession, GridAxis, QueryDialect, QueryResponse, ResultGrid};
use cube_outline::{
    Consolidation, DimensionInfo, DimensionStorage, DimensionTag, MemberQueryRow, MemberRecord,
    MemberSource, NativeError, NativeResult, Outline, ShareOption,
};
use std::cell::Cell;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub fn sample_dimensions() -> Vec<DimensionInfo> {
    vec![
        DimensionInfo::new("Year", DimensionStorage::Dense).with_tag(DimensionTag::Time),
        DimensionInfo::new("Measures", DimensionStorage::Dense).with_tag(DimensionTag::Accounts),
        DimensionInfo::new("Product", DimensionStorage::Sparse),
        DimensionInfo::new("Market", DimensionStorage::Sparse),
        DimensionInfo::new("Scenario", DimensionStorage::Sparse),
    ]
}

fn sample_members() -> HashMap<String, Vec<MemberRecord>> {
    let mut members = HashMap::new();
    members.insert(
        "Year".to_string(),
        vec![
            MemberRecord::new("Year", None, 1, 2),
            MemberRecord::new("Qtr1", Some("Year"), 2, 1),
            MemberRecord::new("Jan", Some("Qtr1"), 3, 0),
            MemberRecord::new("Feb", Some("Qtr1"), 3, 0),
            MemberRecord::new("Mar", Some("Qtr1"), 3, 0),
            MemberRecord::new("Qtr2", Some("Year"), 2, 1),
            MemberRecord::new("Apr", Some("Qtr2"), 3, 0),
            MemberRecord::new("May", Some("Qtr2"), 3, 0),
            MemberRecord::new("Jun", Some("Qtr2"), 3, 0),
        ],
    );
    members.insert(
        "Measures".to_string(),
        vec![
            MemberRecord::new("Measures", None, 1, 2),
            MemberRecord::new("Profit", Some("Measures"), 2, 1),
            MemberRecord::new("Sales", Some("Profit"), 3, 0),
            MemberRecord::new("COGS", Some("Profit"), 3, 0)
                .with_consolidation(Consolidation::Subtract),
        ],
    );
    members.insert(
        "Product".to_string(),
        vec![
            MemberRecord::new("100-20", Some("Diet"), 3, 0).shared(),
            MemberRecord::new("Product", None, 1, 2),
            MemberRecord::new("100", Some("Product"), 2, 1),
            MemberRecord::new("100-10", Some("100"), 3, 0),
            MemberRecord::new("100-20", Some("100"), 3, 0),
            MemberRecord::new("200", Some("Product"), 2, 1),
            MemberRecord::new("200-10", Some("200"), 3, 0),
            MemberRecord::new("Diet", Some("Product"), 2, 1)
                .with_share_option(ShareOption::DynamicCalc),
            MemberRecord::new("200-10", Some("Diet"), 3, 0).shared(),
        ],
    );
    members.insert(
        "Market".to_string(),
        vec![
            MemberRecord::new("Market", None, 1, 2),
            MemberRecord::new("East", Some("Market"), 2, 1),
            MemberRecord::new("New York", Some("East"), 3, 0),
            MemberRecord::new("Boston", Some("East"), 3, 0),
            MemberRecord::new("West", Some("Market"), 2, 1),
            MemberRecord::new("California", Some("West"), 3, 0),
        ],
    );
    members.insert(
        "Scenario".to_string(),
        vec![
            MemberRecord::new("Scenario", None, 1, 1),
            MemberRecord::new("Actual", Some("Scenario"), 2, 0),
            MemberRecord::new("Budget", Some("Scenario"), 2, 0),
            MemberRecord::new("Forecast", Some("Scenario"), 2, 0),
        ],
    );
    members
}

/// In-memory session over a small Sample.Basic-like cube.
#[derive(Debug)]
pub struct FixtureSession {
    pub dimensions: Vec<DimensionInfo>,
    pub members: HashMap<String, Vec<MemberRecord>>,
    /// Traversals and member queries issued so far.
    pub native_calls: Cell<usize>,
    pub submitted: Vec<(QueryDialect, String)>,
    pub responses: VecDeque<QueryResponse>,
    pub server_files: HashMap<String, String>,
    pub copied: Vec<(String, PathBuf)>,
}

impl FixtureSession {
    pub fn sample() -> Self {
        Self {
            dimensions: sample_dimensions(),
            members: sample_members(),
            native_calls: Cell::new(0),
            submitted: Vec::new(),
            responses: VecDeque::new(),
            server_files: HashMap::new(),
            copied: Vec::new(),
        }
    }

    pub fn respond(mut self, response: QueryResponse) -> Self {
        self.responses.push_back(response);
        self
    }

    pub fn outline(&self) -> Outline {
        Outline::load(self.cube_name(), self).unwrap()
    }
}

impl MemberSource for FixtureSession {
    fn dimensions(&self) -> NativeResult<Vec<DimensionInfo>> {
        Ok(self.dimensions.clone())
    }

    fn traverse_descendants(&self, root: &str) -> NativeResult<Vec<MemberRecord>> {
        self.native_calls.set(self.native_calls.get() + 1);
        self.members
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(root))
            .map(|(_, records)| records.clone())
            .ok_or_else(|| NativeError::new(format!("no dimension {root}")))
    }

    fn execute_member_query(
        &self,
        _dimension: &str,
        spec: &str,
    ) -> NativeResult<Vec<MemberQueryRow>> {
        self.native_calls.set(self.native_calls.get() + 1);
        Err(NativeError::new(format!("member query not scripted: {spec}")))
    }

    fn resolve_substitution_variable(&self, name: &str) -> NativeResult<String> {
        match name {
            "CurrScenario" => Ok("Budget".to_string()),
            _ => Err(NativeError::new(format!("no substitution variable {name}"))),
        }
    }
}

impl CubeSession for FixtureSession {
    fn cube_name(&self) -> String {
        "Sample.Basic".to_string()
    }

    fn submit_query(&mut self, dialect: QueryDialect, text: &str) -> NativeResult<QueryResponse> {
        self.submitted.push((dialect, text.to_string()));
        self.responses
            .pop_front()
            .ok_or_else(|| NativeError::new("no scripted response"))
    }

    fn copy_from_server(&mut self, server_file: &str, local_path: &Path) -> NativeResult<()> {
        let content = self
            .server_files
            .get(server_file)
            .ok_or_else(|| NativeError::new(format!("no server file {server_file}")))?;
        std::fs::write(local_path, content).map_err(|err| NativeError::new(err.to_string()))?;
        self.copied
            .push((server_file.to_string(), local_path.to_path_buf()));
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
struct FixtureAxis {
    dimensions: Vec<String>,
    tuples: Vec<Vec<String>>,
}

/// Result grid with scripted axes and cells. `closes` counts `close` calls.
#[derive(Clone, Debug, Default)]
pub struct FixtureGrid {
    pages: FixtureAxis,
    rows: FixtureAxis,
    columns: FixtureAxis,
    cells: Vec<GridCell>,
    /// Cell ordinals that fail to read.
    broken_cells: Vec<usize>,
    pub closes: Rc<Cell<usize>>,
}

fn axis(dimensions: &[&str], tuples: &[&[&str]]) -> FixtureAxis {
    FixtureAxis {
        dimensions: dimensions.iter().map(|d| d.to_string()).collect(),
        tuples: tuples
            .iter()
            .map(|t| t.iter().map(|m| m.to_string()).collect())
            .collect(),
    }
}

impl FixtureGrid {
    pub fn new(closes: &Rc<Cell<usize>>) -> Self {
        Self {
            closes: Rc::clone(closes),
            ..Self::default()
        }
    }

    pub fn pages(mut self, dimensions: &[&str], tuples: &[&[&str]]) -> Self {
        self.pages = axis(dimensions, tuples);
        self
    }

    pub fn rows(mut self, dimensions: &[&str], tuples: &[&[&str]]) -> Self {
        self.rows = axis(dimensions, tuples);
        self
    }

    pub fn columns(mut self, dimensions: &[&str], tuples: &[&[&str]]) -> Self {
        self.columns = axis(dimensions, tuples);
        self
    }

    /// Cells in ordinal order; `None` is a missing cell.
    pub fn cells(mut self, cells: &[Option<f64>]) -> Self {
        self.cells = cells
            .iter()
            .map(|c| match c {
                Some(v) => GridCell::Value(*v),
                None => GridCell::Missing,
            })
            .collect();
        self
    }

    pub fn broken_cell(mut self, ordinal: usize) -> Self {
        self.broken_cells.push(ordinal);
        self
    }

    pub fn boxed(self) -> QueryResponse {
        QueryResponse::Grid(Box::new(self))
    }

    fn axis(&self, axis: GridAxis) -> Option<&FixtureAxis> {
        match axis {
            GridAxis::Pages => Some(&self.pages),
            GridAxis::Rows => Some(&self.rows),
            GridAxis::Columns => Some(&self.columns),
            GridAxis::Slicer => None,
        }
    }
}

impl ResultGrid for FixtureGrid {
    fn dimensions(&self, axis: GridAxis) -> Vec<String> {
        self.axis(axis)
            .map(|a| a.dimensions.clone())
            .unwrap_or_default()
    }

    fn tuple_count(&self, axis: GridAxis) -> usize {
        self.axis(axis).map_or(0, |a| a.tuples.len())
    }

    fn tuple_member(&self, axis: GridAxis, tuple: usize, dimension: usize) -> NativeResult<String> {
        self.axis(axis)
            .and_then(|a| a.tuples.get(tuple))
            .and_then(|t| t.get(dimension))
            .cloned()
            .ok_or_else(|| NativeError::new(format!("no member at {axis:?} {tuple}/{dimension}")))
    }

    fn cell(&self, ordinal: usize) -> NativeResult<GridCell> {
        if self.broken_cells.contains(&ordinal) {
            return Err(NativeError::new(format!("cell {ordinal} unreadable")));
        }
        self.cells
            .get(ordinal)
            .copied()
            .ok_or_else(|| NativeError::new(format!("no cell {ordinal}")))
    }

    fn close(&mut self) -> NativeResult<()> {
        self.closes.set(self.closes.get() + 1);
        Ok(())
    }
}
