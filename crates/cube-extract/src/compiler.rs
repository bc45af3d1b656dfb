use crate::axis::{AxisAssignment, ResolvedExtract};
use crate::config::{Backend, ExtractOptions};
use crate::error::ExtractResult;
use crate::session::QueryDialect;
use crate::{calc, mdx, report};
use cube_outline::{Consolidation, Dimension, MemberId, Outline, OutlineError};
use std::fmt;

/// Chunk position of a partitioned MDX query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionChunk {
    pub dimension: String,
    pub index: usize,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledQuery {
    pub dialect: QueryDialect,
    pub text: String,
    pub partition: Option<PartitionChunk>,
}

/// A dynamically calculated member on a sparse dimension, which the engine computes per block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PerformanceWarning {
    pub dimension: String,
    pub member: String,
    pub estimated_cells: u128,
    /// A selection over stored members that yields the same values.
    pub suggestion: Option<String>,
    /// Calc-script exports leave dynamic members out instead of computing them.
    pub ignored: bool,
}

impl fmt::Display for PerformanceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ignored {
            write!(
                f,
                "dynamic calc member {} of sparse dimension {} is not exported by calc scripts",
                self.member, self.dimension
            )?;
        } else {
            write!(
                f,
                "dynamic calc member {} of sparse dimension {} in a query of about {} cells may be slow",
                self.member, self.dimension, self.estimated_cells
            )?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, "; consider selecting {suggestion} instead")?;
        }
        Ok(())
    }
}

/// Everything compiled for one extract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryPlan {
    pub backend: Backend,
    pub axes: AxisAssignment,
    pub queries: Vec<CompiledQuery>,
    pub warnings: Vec<PerformanceWarning>,
}

impl QueryPlan {
    /// Query text as saved to a query file: chunks separated by `---` lines.
    pub fn query_file_text(&self) -> String {
        let mut text = self
            .queries
            .iter()
            .map(|q| q.text.trim_end())
            .collect::<Vec<_>>()
            .join("\n---\n");
        text.push('\n');
        text
    }
}

/// Reject extracts the selected backend cannot express. Needs only the axis placement, so it can
/// run before any member is expanded.
pub fn check_backend(axes: &AxisAssignment, options: &ExtractOptions) -> ExtractResult<()> {
    match options.backend {
        Backend::Mdx => mdx::check(options),
        Backend::CalcScript => calc::check(axes, options),
        Backend::ReportScript => report::check(axes, options),
    }
}

/// Turns a resolved extract into backend query text.
#[derive(Clone, Copy, Debug)]
pub struct QueryCompiler<'a> {
    pub(crate) outline: &'a Outline,
    pub(crate) resolved: &'a ResolvedExtract,
    pub(crate) options: &'a ExtractOptions,
}

impl<'a> QueryCompiler<'a> {
    /// `outline` must hold the graphs of every dimension in `resolved`.
    pub fn new(
        outline: &'a Outline,
        resolved: &'a ResolvedExtract,
        options: &'a ExtractOptions,
    ) -> Self {
        Self {
            outline,
            resolved,
            options,
        }
    }

    pub fn compile(&self) -> ExtractResult<QueryPlan> {
        check_backend(&self.resolved.axes, self.options)?;

        let warnings = self.performance_warnings()?;
        for warning in &warnings {
            log::warn!("{warning}");
        }

        let queries = match self.options.backend {
            Backend::Mdx => mdx::compile(self)?,
            Backend::CalcScript => vec![calc::compile(self)?],
            Backend::ReportScript => vec![report::compile(self)?],
        };
        log::debug!(
            "compiled {} {} quer{}",
            queries.len(),
            self.options.backend,
            if queries.len() == 1 { "y" } else { "ies" }
        );
        Ok(QueryPlan {
            backend: self.options.backend,
            axes: self.resolved.axes.clone(),
            queries,
            warnings,
        })
    }

    pub(crate) fn dimension(&self, name: &str) -> ExtractResult<&'a Dimension> {
        self.outline
            .get(name)
            .ok_or_else(|| OutlineError::UnknownDimension(name.to_string()).into())
    }

    /// Dynamic calc members on sparse dimensions, by dimension.
    fn sparse_dynamic_members(&self) -> ExtractResult<Vec<(&'a Dimension, MemberId)>> {
        let mut found = Vec::new();
        for (_, name) in self.resolved.axes.iter() {
            let dimension = self.dimension(name)?;
            if dimension.is_dense() {
                continue;
            }
            for &id in self.resolved.members(name) {
                let primary = dimension.member(dimension.member(id).non_shared_member());
                let seen = found.iter().any(|(d, m): &(&Dimension, MemberId)| {
                    *m == primary.id() && d.name().eq_ignore_ascii_case(name)
                });
                if primary.is_dynamic() && !seen {
                    found.push((dimension, primary.id()));
                }
            }
        }
        Ok(found)
    }

    pub(crate) fn has_sparse_dynamic(&self) -> ExtractResult<bool> {
        Ok(!self.sparse_dynamic_members()?.is_empty())
    }

    /// Sparse member combinations times the selected dense block.
    pub fn estimated_cells(&self) -> u128 {
        self.resolved
            .axes
            .iter()
            .map(|(_, name)| self.resolved.members(name).len() as u128)
            .fold(1u128, |acc, n| acc.saturating_mul(n))
    }

    pub fn performance_warnings(&self) -> ExtractResult<Vec<PerformanceWarning>> {
        let dynamic = self.sparse_dynamic_members()?;
        let estimated_cells = self.estimated_cells();
        let ignored = self.options.backend == Backend::CalcScript;
        if !ignored && estimated_cells <= u128::from(self.options.size_warning_threshold) {
            return Ok(Vec::new());
        }

        Ok(dynamic
            .into_iter()
            .map(|(dimension, id)| PerformanceWarning {
                dimension: dimension.name().to_string(),
                member: dimension.member(id).name().to_string(),
                estimated_cells,
                suggestion: suggest_stored_selection(dimension, id),
                ignored,
            })
            .collect())
    }
}

/// `X.Children` or `X.Leaves` when the member is a plain sum of stored members.
fn suggest_stored_selection(dimension: &Dimension, id: MemberId) -> Option<String> {
    let member = dimension.member(id);
    if member.formula().is_some() {
        return None;
    }
    let plain = |ids: &[MemberId]| {
        !ids.is_empty()
            && ids.iter().all(|&c| {
                let child = dimension.member(c);
                child.consolidation() == Consolidation::Add
                    && !dimension.member(child.non_shared_member()).is_dynamic()
            })
    };

    let name = selection_name(member.name());
    if plain(dimension.children_of(id)) {
        Some(format!("{name}.Children"))
    } else if plain(&dimension.leaves(id, false)) {
        Some(format!("{name}.Leaves"))
    } else {
        None
    }
}

fn selection_name(name: &str) -> String {
    if name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        name.to_string()
    } else {
        format!("\"{name}\"")
    }
}

/// `[name]` with closing brackets doubled.
pub(crate) fn bracket(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// `"name"` for calc and report scripts.
pub(crate) fn quote(name: &str) -> String {
    format!("\"{name}\"")
}

/// Member names of `ids`, dropping repeats of the same name (shared instances).
pub(crate) fn distinct_names<'d>(dimension: &'d Dimension, ids: &[MemberId]) -> Vec<&'d str> {
    let mut names: Vec<&str> = Vec::with_capacity(ids.len());
    for &id in ids {
        let name = dimension.member(id).name();
        if !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            names.push(name);
        }
    }
    names
}
