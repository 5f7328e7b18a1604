use arrow::array::{Array, RecordBatch};
use arrow::util::display::{ArrayFormatter, FormatOptions};
use std::fmt::Write as _;
use std::path::Path;
use tablepulse_common::Result;

/// Opaque report-producing capability invoked once per (file, chunk) pair.
/// Only the side effect matters; nothing is read back.
pub trait ReportGenerator {
    fn generate(&self, batch: &RecordBatch, output: &Path) -> Result<()>;
}

/// Renders a static HTML overview of one chunk: row/column counts and a
/// per-column table with type, null stats, and a few sample values.
pub struct HtmlReportGenerator;

const SAMPLE_VALUES: usize = 5;

impl ReportGenerator for HtmlReportGenerator {
    fn generate(&self, batch: &RecordBatch, output: &Path) -> Result<()> {
        let title = output
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("report");
        let rows = batch.num_rows();

        let mut html = String::new();
        let _ = write!(
            html,
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
             <style>body{{font-family:sans-serif;margin:2em}}table{{border-collapse:collapse}}\
             th,td{{border:1px solid #ccc;padding:4px 8px;text-align:left}}th{{background:#f0f0f0}}</style>\n\
             </head>\n<body>\n<h1>{title}</h1>\n<p>{rows} rows &times; {} columns</p>\n\
             <table>\n<tr><th>Column</th><th>Type</th><th>Nulls</th><th>Null %</th><th>Sample</th></tr>\n",
            batch.num_columns()
        );

        let options = FormatOptions::default();
        for (i, field) in batch.schema().fields().iter().enumerate() {
            let column = batch.column(i);
            let nulls = column.null_count();
            let pct = if rows > 0 {
                100.0 * nulls as f64 / rows as f64
            } else {
                0.0
            };
            let formatter = ArrayFormatter::try_new(column.as_ref(), &options)?;
            let mut samples = Vec::new();
            for row in 0..rows.min(SAMPLE_VALUES) {
                if column.is_null(row) {
                    samples.push("∅".to_owned());
                } else {
                    samples.push(escape(&formatter.value(row).to_string()));
                }
            }
            let _ = write!(
                html,
                "<tr><td>{}</td><td>{}</td><td>{nulls}</td><td>{pct:.2}</td><td>{}</td></tr>\n",
                escape(field.name()),
                field.data_type(),
                samples.join(", ")
            );
        }
        html.push_str("</table>\n</body>\n</html>\n");

        std::fs::write(output, html)?;
        Ok(())
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
