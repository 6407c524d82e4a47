/// Header row for macro reports. Micro reports prefix it with `"Group, "`.
pub const TABLE_HEADER: &str =
    "Name, Avg RMS, Number of elements, Accuracy, Number of constraints, Prep time, Resize time, Synth time";

/// The seven numeric fields a result block reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Accuracy,
    Error,
    Elems,
    Constraints,
    Prep,
    Resize,
    Synth,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Accuracy,
        Field::Error,
        Field::Elems,
        Field::Constraints,
        Field::Prep,
        Field::Resize,
        Field::Synth,
    ];

    /// Maps a log key to its field.
    pub fn from_key(key: &str) -> Option<Field> {
        match key {
            "accuracy" => Some(Field::Accuracy),
            "error" => Some(Field::Error),
            "elems" => Some(Field::Elems),
            "constraints" => Some(Field::Constraints),
            "prep" => Some(Field::Prep),
            "resize" => Some(Field::Resize),
            "synth" => Some(Field::Synth),
            _ => None,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Outcome of one benchmark run.
///
/// Numeric fields are only meaningful when `finished` is true. The two count
/// fields are kept as `f64` because aggregates average them; they are
/// rendered as integers.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    pub name: String,
    pub accuracy: f64,
    pub error: f64,
    pub elems: f64,
    pub constraints: f64,
    pub prep: f64,
    pub resize: f64,
    pub synth: f64,
    pub finished: bool,
}

impl MeasurementRecord {
    /// The record for a run that produced no usable data.
    pub fn tombstone(name: &str) -> Self {
        MeasurementRecord {
            name: name.to_string(),
            accuracy: 0.0,
            error: 0.0,
            elems: 0.0,
            constraints: 0.0,
            prep: 0.0,
            resize: 0.0,
            synth: 0.0,
            finished: false,
        }
    }

    pub fn get(&self, field: Field) -> f64 {
        match field {
            Field::Accuracy => self.accuracy,
            Field::Error => self.error,
            Field::Elems => self.elems,
            Field::Constraints => self.constraints,
            Field::Prep => self.prep,
            Field::Resize => self.resize,
            Field::Synth => self.synth,
        }
    }

    /// Renders the record as a report row. The column order is fixed:
    /// error, elems, accuracy, constraints, prep, resize, synth.
    pub fn csv_row(&self) -> String {
        if !self.finished {
            return format!("{},-,-,-,-,-,-,-,-", self.name);
        }
        format!(
            "{},{:.3},{},{:.3},{},{:.3},{:.3},{:.3}",
            self.name,
            self.error,
            self.elems.trunc() as i64,
            self.accuracy,
            self.constraints.trunc() as i64,
            self.prep,
            self.resize,
            self.synth
        )
    }
}

/// Collects field values until all seven are present.
#[derive(Debug, Default, Clone)]
pub struct FieldSet {
    values: [Option<f64>; 7],
}

impl FieldSet {
    pub fn set(&mut self, field: Field, value: f64) {
        self.values[field.index()] = Some(value);
    }

    pub fn is_complete(&self) -> bool {
        self.values.iter().all(Option::is_some)
    }

    /// Names of the fields that have not been supplied.
    pub fn missing(&self) -> Vec<Field> {
        Field::ALL
            .iter()
            .copied()
            .filter(|f| self.values[f.index()].is_none())
            .collect()
    }

    /// Builds a finished record, or `None` if any field is missing.
    pub fn finish(&self, name: &str) -> Option<MeasurementRecord> {
        let [accuracy, error, elems, constraints, prep, resize, synth] = self.values;
        Some(MeasurementRecord {
            name: name.to_string(),
            accuracy: accuracy?,
            error: error?,
            elems: elems?,
            constraints: constraints?,
            prep: prep?,
            resize: resize?,
            synth: synth?,
            finished: true,
        })
    }
}

/// Reduces the finished records field by field. Returns the tombstone when
/// nothing finished.
fn aggregate<F>(records: &[MeasurementRecord], name: &str, reduce: F) -> MeasurementRecord
where
    F: Fn(&[f64]) -> f64,
{
    assert!(!records.is_empty(), "cannot aggregate an empty set of records");

    let valid: Vec<&MeasurementRecord> = records.iter().filter(|r| r.finished).collect();
    if valid.is_empty() {
        return MeasurementRecord::tombstone(name);
    }

    let column = |field: Field| {
        let view: Vec<f64> = valid.iter().map(|r| r.get(field)).collect();
        reduce(&view)
    };
    MeasurementRecord {
        name: name.to_string(),
        accuracy: column(Field::Accuracy),
        error: column(Field::Error),
        elems: column(Field::Elems),
        constraints: column(Field::Constraints),
        prep: column(Field::Prep),
        resize: column(Field::Resize),
        synth: column(Field::Synth),
        finished: true,
    }
}

/// Per-field arithmetic mean of the finished records.
///
/// Panics if `records` is empty.
pub fn aggregate_average(records: &[MeasurementRecord], name: &str) -> MeasurementRecord {
    aggregate(records, name, |view| view.iter().sum::<f64>() / view.len() as f64)
}

/// Per-field sum of the finished records.
///
/// Panics if `records` is empty.
pub fn aggregate_sum(records: &[MeasurementRecord], name: &str) -> MeasurementRecord {
    aggregate(records, name, |view| view.iter().sum::<f64>())
}
