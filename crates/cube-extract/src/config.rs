use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Query language an extract is compiled to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    #[default]
    Mdx,
    CalcScript,
    ReportScript,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Backend::Mdx => "MDX",
            Backend::CalcScript => "calc script",
            Backend::ReportScript => "report script",
        })
    }
}

/// Header rows written ahead of decoded MDX data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderStyle {
    #[default]
    None,
    /// Page members, then one row per column dimension indented past the row-member columns.
    Grid,
    /// A single row of dimension names and column labels.
    File,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionOptions {
    pub dimension: String,
    pub chunk_size: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    pub backend: Backend,
    /// Column dimension for flat extracts; the last dense dimension when unset.
    pub column_dimension: Option<String>,
    /// Split the MDX query into chunks over one dimension's members.
    pub partition: Option<PartitionOptions>,
    /// Ask MDX for block-level empty suppression.
    pub suppress_empty_blocks: bool,
    /// Ask MDX for row-level empty suppression.
    pub suppress_empty_rows: bool,
    /// Drop decoded rows whose cells are all zero or missing.
    pub suppress_zero_rows: bool,
    /// Members whose rows, columns or pages are left out of the decoded output.
    pub suppressed_members: Vec<String>,
    /// Member name substitutions applied to decoded output.
    pub member_renames: BTreeMap<String, String>,
    pub decimals: Option<u32>,
    pub headers: HeaderStyle,
    pub delimiter: char,
    pub missing_text: String,
    /// Also write the compiled query text here.
    pub query_file: Option<PathBuf>,
    /// Server-side file name for calc-script exports. When unset, [`extract`](crate::extract)
    /// uses the output file's name and a plan compiled on its own uses `extract.txt`.
    pub server_file: Option<String>,
    /// Estimated cell count above which dynamic sparse members draw a warning.
    pub size_warning_threshold: u64,
}

const DEFAULT_SERVER_FILE: &str = "extract.txt";

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            column_dimension: None,
            partition: None,
            suppress_empty_blocks: false,
            suppress_empty_rows: true,
            suppress_zero_rows: true,
            suppressed_members: Vec::new(),
            member_renames: BTreeMap::new(),
            decimals: None,
            headers: HeaderStyle::default(),
            delimiter: '\t',
            missing_text: "-".to_string(),
            query_file: None,
            server_file: None,
            size_warning_threshold: 1_000_000,
        }
    }
}

impl ExtractOptions {
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub(crate) fn server_file(&self) -> &str {
        self.server_file.as_deref().unwrap_or(DEFAULT_SERVER_FILE)
    }
}
