mod common;

use common::{FixtureGrid, FixtureSession};
use cube_extract::{
    extract, AxisSpec, Backend, DimensionSelection, ExtractError, ExtractOptions, ExtractSpec,
    HeaderStyle, PartitionOptions, QueryDialect, QueryResponse,
};
use pretty_assertions::assert_eq;
use std::cell::Cell;
use std::rc::Rc;

fn sel(dimension: &str, members: &[&str]) -> DimensionSelection {
    DimensionSelection::new(dimension, members.iter().copied())
}

fn rows_by_year(products: &[&str], years: &[&str]) -> ExtractSpec {
    ExtractSpec::Axes(AxisSpec {
        rows: vec![sel("Product", products)],
        columns: vec![sel("Year", years)],
        ..AxisSpec::default()
    })
}

#[test]
fn mdx_extract_writes_decoded_rows_and_closes_the_grid() {
    let closes = Rc::new(Cell::new(0));
    let grid = FixtureGrid::new(&closes)
        .rows(&["Product"], &[&["100-10"], &["100-20"], &["200-10"]])
        .columns(&["Year"], &[&["Jan"], &["Feb"], &["Mar"]])
        .cells(&[
            Some(1.26),
            None,
            Some(9.0),
            Some(0.0),
            None,
            Some(5.0),
            Some(3.0),
            Some(4.04),
            Some(0.0),
        ]);
    let mut session = FixtureSession::sample().respond(grid.boxed());
    let mut outline = session.outline();
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.txt");

    let options = ExtractOptions {
        headers: HeaderStyle::File,
        decimals: Some(1),
        suppressed_members: vec!["mar".to_string()],
        member_renames: [("100-10".to_string(), "Cola".to_string())].into(),
        ..ExtractOptions::default()
    };
    let records = extract(
        &mut session,
        &mut outline,
        &rows_by_year(&["100.Children", "200"], &["Qtr1.Children"]),
        &output,
        &options,
    )
    .unwrap();

    assert_eq!(records, 2);
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "Product\tJan\tFeb\nCola\t1.3\t-\n200-10\t3.0\t4.0\n"
    );
    assert_eq!(closes.get(), 1);
    assert_eq!(session.submitted.len(), 1);
    assert_eq!(session.submitted[0].0, QueryDialect::Mdx);
}

#[test]
fn grid_is_closed_when_decoding_fails() {
    let closes = Rc::new(Cell::new(0));
    let grid = FixtureGrid::new(&closes)
        .rows(&["Product"], &[&["100-10"]])
        .columns(&["Year"], &[&["Jan"]])
        .cells(&[Some(1.0)])
        .broken_cell(0);
    let mut session = FixtureSession::sample().respond(grid.boxed());
    let mut outline = session.outline();
    let dir = tempfile::tempdir().unwrap();

    let err = extract(
        &mut session,
        &mut outline,
        &rows_by_year(&["100-10"], &["Jan"]),
        &dir.path().join("out.txt"),
        &ExtractOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ExtractError::Native(_)), "{err}");
    assert_eq!(closes.get(), 1);
}

#[test]
fn partitioned_extract_appends_chunks_with_one_header() {
    let closes = Rc::new(Cell::new(0));
    let first = FixtureGrid::new(&closes)
        .rows(&["Product"], &[&["100-10"]])
        .columns(&["Year"], &[&["Jan"]])
        .cells(&[Some(1.0)]);
    let second = FixtureGrid::new(&closes)
        .rows(&["Product"], &[&["100-20"]])
        .columns(&["Year"], &[&["Jan"]])
        .cells(&[Some(2.0)]);
    let mut session = FixtureSession::sample()
        .respond(first.boxed())
        .respond(second.boxed());
    let mut outline = session.outline();
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.txt");
    let query_file = dir.path().join("query.mdx");

    let options = ExtractOptions {
        headers: HeaderStyle::File,
        partition: Some(PartitionOptions {
            dimension: "Product".to_string(),
            chunk_size: 1,
        }),
        query_file: Some(query_file.clone()),
        ..ExtractOptions::default()
    };
    let records = extract(
        &mut session,
        &mut outline,
        &rows_by_year(&["100.Children"], &["Jan"]),
        &output,
        &options,
    )
    .unwrap();

    assert_eq!(records, 2);
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "Product\tJan\n100-10\t1\n100-20\t2\n"
    );
    assert_eq!(closes.get(), 2);

    let saved = std::fs::read_to_string(&query_file).unwrap();
    let chunks: Vec<&str> = saved.split("\n---\n").collect();
    assert_eq!(chunks.len(), 2);
    assert_eq!(format!("{}\n", chunks[0]), session.submitted[0].1);
    assert!(chunks[1].contains("SET [ProductSet] AS '{[100-20]}'"));
}

#[test]
fn header_waits_for_the_first_chunk_with_rows() {
    let closes = Rc::new(Cell::new(0));
    let empty = FixtureGrid::new(&closes)
        .rows(&["Product"], &[&["100-10"]])
        .columns(&["Year"], &[&["Jan"]])
        .cells(&[None]);
    let second = FixtureGrid::new(&closes)
        .rows(&["Product"], &[&["100-20"]])
        .columns(&["Year"], &[&["Jan"]])
        .cells(&[Some(2.0)]);
    let mut session = FixtureSession::sample()
        .respond(empty.boxed())
        .respond(second.boxed());
    let mut outline = session.outline();
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.txt");

    let options = ExtractOptions {
        headers: HeaderStyle::File,
        partition: Some(PartitionOptions {
            dimension: "Product".to_string(),
            chunk_size: 1,
        }),
        ..ExtractOptions::default()
    };
    let records = extract(
        &mut session,
        &mut outline,
        &rows_by_year(&["100.Children"], &["Jan"]),
        &output,
        &options,
    )
    .unwrap();

    assert_eq!(records, 1);
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "Product\tJan\n100-20\t2\n"
    );
    assert_eq!(closes.get(), 2);
}

#[test]
fn report_extract_saves_the_engine_output() {
    let report = "\tJan\tFeb\n100-10\t1\t2\n100-20\t3\t-\n";
    let mut session =
        FixtureSession::sample().respond(QueryResponse::Report(report.to_string()));
    let mut outline = session.outline();
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.txt");

    let records = extract(
        &mut session,
        &mut outline,
        &rows_by_year(&["100.Children"], &["Jan", "Feb"]),
        &output,
        &ExtractOptions::default().with_backend(Backend::ReportScript),
    )
    .unwrap();

    assert_eq!(records, 2);
    assert_eq!(std::fs::read_to_string(&output).unwrap(), report);
    assert_eq!(session.submitted[0].0, QueryDialect::ReportScript);
    assert!(session.submitted[0].1.ends_with("!\n"));
}

#[test]
fn calc_extract_copies_the_server_file() {
    let mut session = FixtureSession::sample().respond(QueryResponse::Completed);
    session.server_files.insert(
        "out.txt".to_string(),
        "\"Product\"\t\"Jan\"\n\"100-10\"\t1\n\"100-20\"\t2\n".to_string(),
    );
    let mut outline = session.outline();
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.txt");

    let options = ExtractOptions {
        backend: Backend::CalcScript,
        headers: HeaderStyle::File,
        ..ExtractOptions::default()
    };
    let records = extract(
        &mut session,
        &mut outline,
        &rows_by_year(&["100.Children"], &["Jan"]),
        &output,
        &options,
    )
    .unwrap();

    assert_eq!(records, 2);
    assert_eq!(session.copied, vec![("out.txt".to_string(), output.clone())]);
    let script = &session.submitted[0].1;
    assert!(script.contains("DataExportDimHeader ON;"), "{script}");
    assert!(script.contains("\"out.txt\""), "{script}");
}

#[test]
fn unexpected_responses_are_errors() {
    let mut session =
        FixtureSession::sample().respond(QueryResponse::Report("not a grid".to_string()));
    let mut outline = session.outline();
    let dir = tempfile::tempdir().unwrap();
    let spec = rows_by_year(&["100-10"], &["Jan"]);

    let err = extract(
        &mut session,
        &mut outline,
        &spec,
        &dir.path().join("out.txt"),
        &ExtractOptions::default(),
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "unexpected report response to MDX query");

    let err = extract(
        &mut session,
        &mut outline,
        &spec,
        &dir.path().join("out.txt"),
        &ExtractOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ExtractError::Native(_)), "{err}");
}
