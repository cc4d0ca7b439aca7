use std::fs::OpenOptions;
use std::io::{BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::record::MutationRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportMode {
    /// Truncate and write fresh
    Replace,
    /// Append to an existing report
    Append,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Columns {
    /// `id,line,TYPE,OP,"op1","op2","assigned"`
    Full,
    /// `id,line,"op1","op2","assigned"`
    Compact,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFormat {
    pub file_name: String,
    pub mode: ReportMode,
    pub columns: Columns,
}

pub fn render_line(record: &MutationRecord, columns: Columns) -> String {
    let assigned = record.assigned_to.as_deref().unwrap_or("NULL");
    let [op1, op2] = [&record.operands[0].text, &record.operands[1].text];
    match columns {
        Columns::Full => format!(
            "{},{},{},{},\"{op1}\",\"{op2}\",\"{assigned}\"",
            record.id,
            record.line,
            record.result_type.report_name(),
            record.operator.name(),
        ),
        Columns::Compact => format!("{},{},\"{op1}\",\"{op2}\",\"{assigned}\"", record.id, record.line),
    }
}

/// Write `records` to `dir/<file_name>` and return the report path.
pub fn write_report(dir: &Utf8Path, format: &ReportFormat, records: &[MutationRecord]) -> Result<Utf8PathBuf> {
    let path = dir.join(&format.file_name);
    let report_err = |source| Error::Report { path: path.clone(), source };

    let mut options = OpenOptions::new();
    options.create(true);
    match format.mode {
        ReportMode::Replace => options.write(true).truncate(true),
        ReportMode::Append => options.append(true),
    };
    let file = options.open(&path).map_err(report_err)?;
    let mut writer = BufWriter::new(file);
    for record in records {
        writeln!(writer, "{}", render_line(record, format.columns)).map_err(report_err)?;
    }
    writer.flush().map_err(report_err)?;

    log::info!("wrote {} records to {path}", records.len());
    Ok(path)
}
