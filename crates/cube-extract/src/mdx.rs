use crate::axis::ResolvedExtract;
use crate::compiler::{bracket, CompiledQuery, PartitionChunk, QueryCompiler};
use crate::config::ExtractOptions;
use crate::error::{ExtractError, ExtractResult};
use crate::session::QueryDialect;
use cube_outline::{Dimension, MemberId};

pub(crate) fn check(options: &ExtractOptions) -> ExtractResult<()> {
    match &options.partition {
        Some(partition) if partition.chunk_size == 0 => Err(ExtractError::InvalidPartition {
            dimension: partition.dimension.clone(),
            reason: "chunk size must be at least 1".to_string(),
        }),
        _ => Ok(()),
    }
}

pub(crate) fn compile(compiler: &QueryCompiler<'_>) -> ExtractResult<Vec<CompiledQuery>> {
    let suppression = suppression(compiler)?;
    let Some(partition) = &compiler.options.partition else {
        return Ok(vec![CompiledQuery {
            dialect: QueryDialect::Mdx,
            text: render(compiler, compiler.resolved, suppression)?,
            partition: None,
        }]);
    };

    let axes = &compiler.resolved.axes;
    let (axis, dimension) = axes
        .iter()
        .find(|(_, d)| d.eq_ignore_ascii_case(&partition.dimension))
        .ok_or_else(|| ExtractError::InvalidPartition {
            dimension: partition.dimension.clone(),
            reason: "dimension is not part of the extract".to_string(),
        })?;
    if axis == crate::axis::Axis::Pov {
        return Err(ExtractError::InvalidPartition {
            dimension: dimension.to_string(),
            reason: "pov dimensions hold a single member".to_string(),
        });
    }

    let members = compiler.resolved.members(dimension);
    let count = members.len().div_ceil(partition.chunk_size);
    members
        .chunks(partition.chunk_size)
        .enumerate()
        .map(|(index, chunk)| {
            let part = compiler.resolved.with_members(dimension, chunk.to_vec());
            Ok(CompiledQuery {
                dialect: QueryDialect::Mdx,
                text: render(compiler, &part, suppression)?,
                partition: Some(PartitionChunk {
                    dimension: dimension.to_string(),
                    index,
                    count,
                }),
            })
        })
        .collect()
}

/// Prefix for the row axis.
fn suppression(compiler: &QueryCompiler<'_>) -> ExtractResult<&'static str> {
    let options = compiler.options;
    if options.suppress_empty_blocks {
        if !compiler.has_sparse_dynamic()? {
            return Ok("NON EMPTYBLOCK ");
        }
        log::warn!(
            "block suppression skips dynamic calc members on sparse dimensions; using row suppression"
        );
        return Ok("NON EMPTY ");
    }
    Ok(if options.suppress_empty_rows {
        "NON EMPTY "
    } else {
        ""
    })
}

fn render(
    compiler: &QueryCompiler<'_>,
    resolved: &ResolvedExtract,
    suppression: &str,
) -> ExtractResult<String> {
    let axes = &resolved.axes;
    let mut text = String::new();

    let set_dimensions: Vec<&String> = axes
        .pages
        .iter()
        .chain(&axes.rows)
        .chain(&axes.columns)
        .collect();
    if !set_dimensions.is_empty() {
        text.push_str("WITH\n");
        for name in set_dimensions {
            let dimension = compiler.dimension(name)?;
            let members = member_list(dimension, resolved.members(name));
            text.push_str(&format!("SET {} AS '{{{members}}}'\n", set_name(name)));
        }
    }

    // Axes must be contiguous: without rows, the first page dimension takes the row axis.
    let (rows, pages) = if axes.rows.is_empty() && !axes.pages.is_empty() {
        axes.pages.split_at(1)
    } else {
        (axes.rows.as_slice(), axes.pages.as_slice())
    };
    let mut clauses = vec![format!("{} ON COLUMNS", axis_set(&axes.columns))];
    if !rows.is_empty() {
        clauses.push(format!("{suppression}{} ON ROWS", axis_set(rows)));
    }
    if !pages.is_empty() {
        clauses.push(format!("{} ON PAGES", axis_set(pages)));
    }
    text.push_str("SELECT\n");
    text.push_str(&clauses.join(",\n"));
    text.push_str(&format!("\nFROM {}", cube_name(compiler.outline.cube_name())));

    if !axes.pov.is_empty() {
        let mut slicer = Vec::with_capacity(axes.pov.len());
        for name in &axes.pov {
            let dimension = compiler.dimension(name)?;
            slicer.push(member_list(dimension, resolved.members(name)));
        }
        text.push_str(&format!("\nWHERE ({})", slicer.join(", ")));
    }
    text.push('\n');
    Ok(text)
}

fn set_name(dimension: &str) -> String {
    bracket(&format!("{dimension}Set"))
}

/// Named sets of `dimensions` combined with nested `CrossJoin`s.
fn axis_set(dimensions: &[String]) -> String {
    let mut sets = dimensions.iter().map(|d| format!("{{{}}}", set_name(d)));
    let first = sets.next().unwrap_or_default();
    sets.fold(first, |acc, set| format!("CrossJoin({acc}, {set})"))
}

fn cube_name(cube: &str) -> String {
    cube.split('.').map(bracket).collect::<Vec<_>>().join(".")
}

fn member_list(dimension: &Dimension, ids: &[MemberId]) -> String {
    ids.iter()
        .map(|&id| member_name(dimension, id))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Unique name when the outline has one; shared instances are qualified by their parent.
pub(crate) fn member_name(dimension: &Dimension, id: MemberId) -> String {
    let member = dimension.member(id);
    if let Some(unique) = member.unique_name() {
        return unique.to_string();
    }
    match member.parent() {
        Some(parent) if member.is_shared() => format!(
            "{}.{}",
            bracket(dimension.member(parent).name()),
            bracket(member.name())
        ),
        _ => bracket(member.name()),
    }
}
