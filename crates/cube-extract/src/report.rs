use crate::axis::{Axis, AxisAssignment};
use crate::compiler::{distinct_names, quote, CompiledQuery, QueryCompiler};
use crate::config::{Backend, ExtractOptions};
use crate::error::{ExtractError, ExtractResult};
use crate::session::QueryDialect;

const MEMBERS_PER_LINE: usize = 8;

pub(crate) fn check(axes: &AxisAssignment, options: &ExtractOptions) -> ExtractResult<()> {
    if !axes.pov.is_empty() {
        return Err(ExtractError::UnsupportedAxis {
            backend: Backend::ReportScript,
            axis: Axis::Pov,
            dimensions: axes.pov.join(", "),
        });
    }
    if let Some(partition) = &options.partition {
        return Err(ExtractError::InvalidPartition {
            dimension: partition.dimension.clone(),
            reason: "report scripts run as a single query".to_string(),
        });
    }
    Ok(())
}

pub(crate) fn compile(compiler: &QueryCompiler<'_>) -> ExtractResult<CompiledQuery> {
    let axes = &compiler.resolved.axes;
    let options = compiler.options;
    let mut text = String::new();

    for (keyword, dimensions) in [
        ("<PAGE", &axes.pages),
        ("<ROW", &axes.rows),
        ("<COLUMN", &axes.columns),
    ] {
        if dimensions.is_empty() {
            continue;
        }
        let names: Vec<String> = dimensions.iter().map(|d| quote(d)).collect();
        text.push_str(&format!("{keyword} ({})\n", names.join(", ")));
    }

    text.push_str("{ TABDELIMIT }\n");
    text.push_str("{ NOINDENTGEN }\n");
    text.push_str("{ SUPBRACKETS SUPCOMMAS SUPFEED }\n");
    text.push_str("{ SUPEMPTYROWS SUPMISSINGROWS SUPZEROROWS }\n");
    if let Some(decimals) = options.decimals {
        text.push_str(&format!("{{ DECIMAL {decimals} }}\n"));
    }
    if !options.missing_text.is_empty() {
        text.push_str(&format!("{{ MISSINGTEXT {} }}\n", quote(&options.missing_text)));
    }

    for name in axes.pages.iter().chain(&axes.rows).chain(&axes.columns) {
        let dimension = compiler.dimension(name)?;
        let members: Vec<String> = distinct_names(dimension, compiler.resolved.members(name))
            .into_iter()
            .map(quote)
            .collect();
        for line in members.chunks(MEMBERS_PER_LINE) {
            text.push_str(&line.join(" "));
            text.push('\n');
        }
    }
    text.push_str("!\n");

    Ok(CompiledQuery {
        dialect: QueryDialect::ReportScript,
        text,
        partition: None,
    })
}
