use crate::error::Result;
use crate::measurement::{MeasurementRecord, TABLE_HEADER};
use prettytable::{Cell, Row, Table};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// A CSV report that is truncated when opened and appended to row by row.
pub struct ReportWriter {
    path: PathBuf,
    out: BufWriter<File>,
}

impl ReportWriter {
    /// Discards any previous report at `path` and writes `header`.
    pub fn create<P: AsRef<Path>>(path: P, header: &str) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        File::create(&path)?;
        let file = OpenOptions::new().append(true).open(&path)?;
        let mut report = ReportWriter {
            path,
            out: BufWriter::new(file),
        };
        report.line(header)?;
        Ok(report)
    }

    /// Macro report: bare header.
    pub fn macro_report<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::create(path, TABLE_HEADER)
    }

    /// Micro report: every row carries its group.
    pub fn micro_report<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::create(path, &format!("Group, {}", TABLE_HEADER))
    }

    fn line(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "{}", text)?;
        // Rows already written survive an interrupted batch.
        self.out.flush()?;
        Ok(())
    }

    pub fn row(&mut self, record: &MeasurementRecord) -> Result<()> {
        self.line(&record.csv_row())
    }

    pub fn group_row(&mut self, group: &str, record: &MeasurementRecord) -> Result<()> {
        self.line(&format!("{}, {}", group, record.csv_row()))
    }

    pub fn finish(mut self) -> Result<PathBuf> {
        self.out.flush()?;
        Ok(self.path)
    }
}

fn record_cells(record: &MeasurementRecord) -> Vec<Cell> {
    if !record.finished {
        let mut cells = vec![Cell::new(&record.name)];
        cells.extend((0..7).map(|_| Cell::new("-")));
        return cells;
    }
    vec![
        Cell::new(&record.name),
        Cell::new(&format!("{:.3}", record.error)),
        Cell::new(&format!("{}", record.elems.trunc() as i64)),
        Cell::new(&format!("{:.3}", record.accuracy)),
        Cell::new(&format!("{}", record.constraints.trunc() as i64)),
        Cell::new(&format!("{:.3}", record.prep)),
        Cell::new(&format!("{:.3}", record.resize)),
        Cell::new(&format!("{:.3}", record.synth)),
    ]
}

fn header_row(group: bool) -> Row {
    let mut cells = Vec::new();
    if group {
        cells.push(Cell::new("Group"));
    }
    cells.extend(TABLE_HEADER.split(", ").map(Cell::new));
    Row::new(cells)
}

/// Builds the console table for a list of records.
pub fn records_table(records: &[MeasurementRecord]) -> Table {
    let mut table = Table::new();
    table.add_row(header_row(false));
    for record in records {
        table.add_row(Row::new(record_cells(record)));
    }
    table
}

/// Builds the console table for group-tagged records.
pub fn grouped_table(records: &[(String, MeasurementRecord)]) -> Table {
    let mut table = Table::new();
    table.add_row(header_row(true));
    for (group, record) in records {
        let mut cells = vec![Cell::new(group)];
        cells.extend(record_cells(record));
        table.add_row(Row::new(cells));
    }
    table
}

/// Mean synthesis time per size for both algorithm variants. `None` marks a
/// size where no repetition produced a result.
#[derive(Debug, Clone, PartialEq)]
pub struct HierComparison {
    pub hier: Vec<Option<f64>>,
    pub flat: Vec<Option<f64>>,
}

fn timing_cell(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "-".to_string(),
    }
}

impl HierComparison {
    fn header(&self) -> Vec<String> {
        let mut cells = vec!["Algorithm".to_string()];
        cells.extend((1..=self.hier.len()).map(|rows| format!("{} rows", rows)));
        cells
    }

    fn variant(name: &str, times: &[Option<f64>]) -> Vec<String> {
        let mut cells = vec![name.to_string()];
        cells.extend(times.iter().map(|t| timing_cell(*t)));
        cells
    }

    /// Header plus one line per variant, comma separated.
    pub fn csv_lines(&self) -> Vec<String> {
        vec![
            self.header().join(", "),
            Self::variant("Hier", &self.hier).join(", "),
            Self::variant("Flat", &self.flat).join(", "),
        ]
    }
}

/// Prints the summary of a finished report to stdout.
pub fn print_report_summary(title: &str, table: &Table, path: &Path) {
    println!("\nResults for {}:", title);
    table.printstd();
    println!("done! results printed to {}", path.display());
}
