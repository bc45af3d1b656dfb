use crate::axis::{AxisAssigner, ResolvedExtract};
use crate::compiler::{check_backend, CompiledQuery, QueryCompiler, QueryPlan};
use crate::config::{Backend, ExtractOptions, HeaderStyle};
use crate::decoder::{DecodeOptions, ResultDecoder};
use crate::error::{ExtractError, ExtractResult};
use crate::session::{CubeSession, GridGuard, QueryDialect, QueryResponse};
use crate::spec::ExtractSpec;
use crate::writer::{write_query_file, RowWriter};
use cube_outline::{MemberSource, Outline};
use std::borrow::Cow;
use std::path::Path;

/// Place, expand and compile an extract without running it.
///
/// Backend restrictions are checked before any member graph is fetched.
pub fn plan_extract(
    outline: &mut Outline,
    source: &dyn MemberSource,
    spec: &ExtractSpec,
    options: &ExtractOptions,
) -> ExtractResult<QueryPlan> {
    let plan = AxisAssigner::new(outline).assign(spec, options)?;
    // Pov dimensions may still move to the page axis; they are checked again after expansion.
    let mut placed = plan.assignment.clone();
    placed.pov.clear();
    check_backend(&placed, options)?;
    let resolved = ResolvedExtract::resolve(outline, source, plan)?;
    QueryCompiler::new(outline, &resolved, options).compile()
}

/// Run an extract against `session` and write the result to `output`.
///
/// Returns the number of data records written.
pub fn extract<S: CubeSession>(
    session: &mut S,
    outline: &mut Outline,
    spec: &ExtractSpec,
    output: &Path,
    options: &ExtractOptions,
) -> ExtractResult<usize> {
    let options = with_server_file(options, output);
    let plan = plan_extract(outline, &*session, spec, &options)?;
    if let Some(path) = &options.query_file {
        write_query_file(path, &plan)?;
    }

    let records = match plan.backend {
        Backend::Mdx => run_mdx(session, &plan, output, &options)?,
        Backend::ReportScript => run_report(session, &plan, output)?,
        Backend::CalcScript => run_calc(session, &plan, output, &options)?,
    };
    log::info!(
        "extracted {records} records from {} to {}",
        outline.cube_name(),
        output.display()
    );
    Ok(records)
}

/// Calc exports land on the server under the output's file name unless told otherwise.
fn with_server_file<'o>(options: &'o ExtractOptions, output: &Path) -> Cow<'o, ExtractOptions> {
    if options.backend != Backend::CalcScript || options.server_file.is_some() {
        return Cow::Borrowed(options);
    }
    let mut options = options.clone();
    options.server_file = output
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());
    Cow::Owned(options)
}

fn submit<S: CubeSession>(
    session: &mut S,
    query: &CompiledQuery,
) -> ExtractResult<QueryResponse> {
    if let Some(chunk) = &query.partition {
        log::debug!(
            "running {} chunk {} of {}",
            chunk.dimension,
            chunk.index + 1,
            chunk.count
        );
    }
    Ok(session.submit_query(query.dialect, &query.text)?)
}

fn unexpected(dialect: QueryDialect, response: QueryResponse) -> ExtractError {
    let got = response.kind();
    if let QueryResponse::Grid(grid) = response {
        drop(GridGuard::new(grid));
    }
    ExtractError::UnexpectedResponse { dialect, got }
}

fn run_mdx<S: CubeSession>(
    session: &mut S,
    plan: &QueryPlan,
    output: &Path,
    options: &ExtractOptions,
) -> ExtractResult<usize> {
    let mut writer = RowWriter::create(output, options)?;
    let mut decode = DecodeOptions::from_extract(options);
    let mut records = 0;

    for query in &plan.queries {
        let guard = match submit(session, query)? {
            QueryResponse::Grid(grid) => GridGuard::new(grid),
            other => return Err(unexpected(QueryDialect::Mdx, other)),
        };
        let headers_emitted = {
            let mut decoder = ResultDecoder::new(guard.grid(), &decode)?;
            for row in &mut decoder {
                writer.write_row(&row?)?;
            }
            records += decoder.records();
            decoder.headers_emitted()
        };
        guard.close()?;
        // Later chunks append below the header written by the first non-empty one.
        if headers_emitted {
            decode.headers = HeaderStyle::None;
        }
    }

    writer.flush()?;
    Ok(records)
}

fn run_report<S: CubeSession>(
    session: &mut S,
    plan: &QueryPlan,
    output: &Path,
) -> ExtractResult<usize> {
    let mut text = String::new();
    for query in &plan.queries {
        match submit(session, query)? {
            QueryResponse::Report(report) => text.push_str(&report),
            other => return Err(unexpected(QueryDialect::ReportScript, other)),
        }
    }
    std::fs::write(output, &text)?;
    Ok(report_records(&text, plan.axes.rows.len()))
}

/// Data lines of report output: they start with row members and carry at least one value.
/// Column headings are indented and page headings hold only page members.
pub(crate) fn report_records(text: &str, row_dimensions: usize) -> usize {
    text.lines()
        .filter(|line| !line.trim().is_empty() && !line.starts_with('\t'))
        .filter(|line| line.split('\t').count() > row_dimensions.max(1))
        .count()
}

fn run_calc<S: CubeSession>(
    session: &mut S,
    plan: &QueryPlan,
    output: &Path,
    options: &ExtractOptions,
) -> ExtractResult<usize> {
    for query in &plan.queries {
        match submit(session, query)? {
            QueryResponse::Completed | QueryResponse::Report(_) => {}
            other => return Err(unexpected(QueryDialect::CalcScript, other)),
        }
    }
    session.copy_from_server(options.server_file(), output)?;

    let exported = std::fs::read_to_string(output)?;
    let lines = exported.lines().filter(|l| !l.trim().is_empty()).count();
    let headers = usize::from(options.headers != HeaderStyle::None);
    Ok(lines.saturating_sub(headers))
}
