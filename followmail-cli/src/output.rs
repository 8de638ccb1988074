//! Output formatting abstraction for table, CSV and JSON rendering
//!
//! The report flows through [`OutputWriter`], which handles format switching
//! and the empty-report message. Nothing is written until the report is
//! complete, so a failed run never leaves partial output behind.

use std::io::Write;

use colored::Colorize;
use serde::Serialize;

use followmail_core::types::OutputFormat;
use followmail_trace::report::{COLUMNS, ReportRow};

use crate::error::CliError;

/// Printed in place of a report with no rows.
pub const NO_DATA: &str = "no data found";

/// Writes a payload in the selected format.
pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    /// Create a new output writer with the specified format.
    ///
    /// # Examples
    ///
    /// ```
    /// use followmail_cli::output::OutputWriter;
    /// use followmail_core::types::OutputFormat;
    ///
    /// let writer = OutputWriter::new(OutputFormat::Csv);
    /// ```
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Render a payload to `w`.
    ///
    /// Empty payloads print [`NO_DATA`] whatever the format.
    pub fn render_to<T: Render + Serialize + ?Sized>(
        &self,
        w: &mut dyn Write,
        payload: &T,
    ) -> Result<(), CliError> {
        if payload.is_empty() {
            writeln!(w, "{NO_DATA}")?;
            return Ok(());
        }

        match self.format {
            OutputFormat::Table => payload.render_table(w)?,
            OutputFormat::Csv => payload.render_csv(w)?,
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut *w, payload)?;
                writeln!(w)?;
            }
        }
        w.flush()?;
        Ok(())
    }
}

/// Text renderings of an output payload.
///
/// Implemented alongside `serde::Serialize`, which covers JSON.
pub trait Render {
    fn render_table(&self, w: &mut dyn Write) -> std::io::Result<()>;

    fn render_csv(&self, w: &mut dyn Write) -> std::io::Result<()>;

    fn is_empty(&self) -> bool {
        false
    }
}

impl Render for [ReportRow] {
    fn render_table(&self, w: &mut dyn Write) -> std::io::Result<()> {
        // every column but the last is padded to its widest cell
        let mut widths = COLUMNS.map(str::len);
        for row in self {
            for (width, field) in widths.iter_mut().zip(row.fields()) {
                *width = (*width).max(field.chars().count());
            }
        }

        let last = COLUMNS.len() - 1;
        let header = COLUMNS
            .iter()
            .enumerate()
            .map(|(i, name)| {
                if i == last {
                    name.to_string()
                } else {
                    format!("{:<width$}", name, width = widths[i])
                }
            })
            .collect::<Vec<_>>()
            .join("  ");
        writeln!(w, "{}", header.bold())?;

        for row in self {
            let line = row
                .fields()
                .iter()
                .enumerate()
                .map(|(i, field)| {
                    if i == last {
                        field.to_string()
                    } else {
                        format!("{:<width$}", field, width = widths[i])
                    }
                })
                .collect::<Vec<_>>()
                .join("  ");
            writeln!(w, "{line}")?;
        }
        Ok(())
    }

    fn render_csv(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "{}", COLUMNS.join(","))?;
        for row in self {
            let line = row
                .fields()
                .iter()
                .map(|field| csv_field(field))
                .collect::<Vec<_>>()
                .join(",");
            writeln!(w, "{line}")?;
        }
        Ok(())
    }

    fn is_empty(&self) -> bool {
        <[ReportRow]>::is_empty(self)
    }
}

/// Quotes a CSV field when it contains a delimiter, quote or line break.
fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_owned()
    }
}
