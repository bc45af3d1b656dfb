use crate::compiler::QueryPlan;
use crate::config::ExtractOptions;
use crate::decoder::{round, Field, OutputRow};
use crate::error::{ExtractError, ExtractResult};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Delimited output for decoded rows.
pub struct RowWriter<W: Write> {
    inner: csv::Writer<W>,
    decimals: Option<u32>,
    missing_text: String,
}

impl RowWriter<BufWriter<File>> {
    pub fn create(path: &Path, options: &ExtractOptions) -> ExtractResult<Self> {
        let file = File::create(path)?;
        Self::from_writer(BufWriter::new(file), options)
    }
}

impl<W: Write> RowWriter<W> {
    pub fn from_writer(writer: W, options: &ExtractOptions) -> ExtractResult<Self> {
        let delimiter = u8::try_from(options.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| ExtractError::InvalidOption {
                option: "delimiter",
                reason: format!("{:?} is not a single ASCII character", options.delimiter),
            })?;
        let inner = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .terminator(csv::Terminator::Any(b'\n'))
            .quote_style(csv::QuoteStyle::Necessary)
            .flexible(true)
            .from_writer(writer);
        Ok(Self {
            inner,
            decimals: options.decimals,
            missing_text: options.missing_text.clone(),
        })
    }

    pub fn write_row(&mut self, row: &OutputRow) -> ExtractResult<()> {
        self.inner.write_record(
            row.fields
                .iter()
                .map(|field| format_field(field, self.decimals, &self.missing_text)),
        )?;
        Ok(())
    }

    pub fn flush(&mut self) -> ExtractResult<()> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> ExtractResult<W> {
        self.inner
            .into_inner()
            .map_err(|err| ExtractError::Io(err.into_error()))
    }
}

pub fn format_field(field: &Field, decimals: Option<u32>, missing_text: &str) -> String {
    match field {
        Field::Text(text) => text.clone(),
        Field::Number(value) => match decimals {
            Some(decimals) => format!(
                "{:.prec$}",
                round(*value, decimals),
                prec = decimals as usize
            ),
            None => value.to_string(),
        },
        Field::Missing => missing_text.to_string(),
        Field::Blank => String::new(),
    }
}

/// Save the compiled query text of `plan`.
pub fn write_query_file(path: &Path, plan: &QueryPlan) -> ExtractResult<()> {
    std::fs::write(path, plan.query_file_text())?;
    log::debug!("wrote {} queries to {}", plan.queries.len(), path.display());
    Ok(())
}
