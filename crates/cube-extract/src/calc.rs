use crate::axis::{Axis, AxisAssignment};
use crate::compiler::{distinct_names, quote, CompiledQuery, QueryCompiler};
use crate::config::{Backend, ExtractOptions, HeaderStyle};
use crate::error::{ExtractError, ExtractResult};
use crate::session::QueryDialect;

const INDENT: &str = "    ";

pub(crate) fn check(axes: &AxisAssignment, options: &ExtractOptions) -> ExtractResult<()> {
    for axis in [Axis::Pov, Axis::Pages] {
        if !axes.axis(axis).is_empty() {
            return Err(ExtractError::UnsupportedAxis {
                backend: Backend::CalcScript,
                axis,
                dimensions: axes.axis(axis).join(", "),
            });
        }
    }
    if axes.columns.len() > 1 {
        return Err(ExtractError::TooManyColumnDimensions {
            backend: Backend::CalcScript,
            count: axes.columns.len(),
            dimensions: axes.columns.join(", "),
        });
    }
    if axes.columns.is_empty() {
        return Err(ExtractError::NoColumnDimension);
    }
    if let Some(partition) = &options.partition {
        return Err(ExtractError::InvalidPartition {
            dimension: partition.dimension.clone(),
            reason: "calc script extracts run as a single export".to_string(),
        });
    }
    Ok(())
}

/// A `DATAEXPORT` inside one nested `FIX` per dimension, rows first.
pub(crate) fn compile(compiler: &QueryCompiler<'_>) -> ExtractResult<CompiledQuery> {
    let axes = &compiler.resolved.axes;
    let options = compiler.options;

    let mut text = String::from("SET DATAEXPORTOPTIONS\n{\n");
    let mut option = |line: String| {
        text.push_str(INDENT);
        text.push_str(&line);
        text.push_str(";\n");
    };
    option("DataExportLevel \"ALL\"".to_string());
    option("DataExportDynamicCalc OFF".to_string());
    option("DataExportOverwriteFile ON".to_string());
    option("DataExportColFormat ON".to_string());
    option(format!("DataExportColHeader {}", quote(&axes.columns[0])));
    if options.headers != HeaderStyle::None {
        option("DataExportDimHeader ON".to_string());
    }
    if let Some(decimals) = options.decimals {
        option(format!("DataExportDecimal {decimals}"));
    }
    text.push_str("};\n\n");

    let fixed: Vec<&String> = axes.rows.iter().chain(&axes.columns).collect();
    for (depth, name) in fixed.iter().enumerate() {
        let dimension = compiler.dimension(name)?;
        let members: Vec<String> = distinct_names(dimension, compiler.resolved.members(name))
            .into_iter()
            .map(quote)
            .collect();
        text.push_str(&INDENT.repeat(depth));
        text.push_str(&format!("FIX ({})\n", members.join(", ")));
    }

    text.push_str(&INDENT.repeat(fixed.len()));
    text.push_str(&format!(
        "DATAEXPORT \"File\" {} {} {};\n",
        quote(&options.delimiter.to_string()),
        quote(options.server_file()),
        quote(&options.missing_text)
    ));

    for depth in (0..fixed.len()).rev() {
        text.push_str(&INDENT.repeat(depth));
        text.push_str("ENDFIX\n");
    }

    Ok(CompiledQuery {
        dialect: QueryDialect::CalcScript,
        text,
        partition: None,
    })
}
