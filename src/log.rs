use std::collections::HashMap;
use std::path::Path;

use csv::StringRecord;
use thiserror::Error;
use tracing::debug;

use crate::parse_util;

/// Name of the column holding the simulation time, in seconds
pub const TIME_COLUMN: &str = "time";

/// Name of the column holding the cell coordinate, `(x,y)`
pub const COORDINATE_COLUMN: &str = "model_name";

/// Name of the column holding the cell payload, `<...>`
pub const PAYLOAD_COLUMN: &str = "data";

/// Name of the column that marks port (non-cell) events
pub const PORT_COLUMN: &str = "port_name";

const REQUIRED_COLUMNS: [&str; 4] = [TIME_COLUMN, COORDINATE_COLUMN, PAYLOAD_COLUMN, PORT_COLUMN];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read log: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed table: {0}")]
    Csv(#[from] csv::Error),

    #[error("Empty log, expected a header line")]
    Empty,

    #[error("Invalid delimiter declaration \"{line}\"")]
    InvalidDelimiter { line: String },

    #[error("Missing required column \"{name}\"")]
    MissingColumn { name: &'static str },

    #[error("Line {line}: expected at least {expected} fields, found {found}")]
    ShortRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Line {line}: invalid time \"{got}\"")]
    InvalidTime { line: usize, got: String },

    #[error("The log has no grid rows, nothing to render")]
    NoGridRows,
}

/// A single grid row of the log
#[derive(Debug, Clone, PartialEq)]
pub struct EventRow {
    /// 1-based line number in the source
    pub line: usize,

    /// Simulation time, in seconds
    pub time: f64,

    /// Raw coordinate, e.g. `(3,7)`
    pub coordinate: String,

    /// Only ever `None` once the row made it into an [`EventLog`]
    pub port_name: Option<String>,

    /// Raw payload, e.g. `<100,0.2,0.3,0.5>`
    pub payload: String,
}

/// All rows of one distinct simulation time
#[derive(Debug)]
pub struct Frame<'a> {
    /// Position of the frame in playback order
    pub index: usize,

    pub time: f64,

    /// Rows in file order
    pub rows: Vec<&'a EventRow>,
}

#[derive(Debug)]
struct FrameIndex {
    time: f64,
    rows: Vec<usize>,
}

/// The grid rows of a log, grouped into frames.
#[derive(Debug)]
pub struct EventLog {
    rows: Vec<EventRow>,
    frames: Vec<FrameIndex>,
    port_rows: usize,
}

impl EventLog {
    /// Builds the frame index over `rows`, dropping port events.
    pub fn from_rows(rows: impl IntoIterator<Item = EventRow>) -> Result<Self, LoadError> {
        let mut port_rows = 0;
        let mut frames: Vec<FrameIndex> = Vec::new();
        let mut lookup: HashMap<u64, usize> = HashMap::new();
        let mut kept = Vec::new();

        for row in rows {
            if row.port_name.is_some() {
                port_rows += 1;
                continue;
            }

            // `-0.0` and `0.0` are the same frame
            let key = (row.time + 0.0).to_bits();
            let frame = *lookup.entry(key).or_insert_with(|| {
                frames.push(FrameIndex {
                    time: row.time,
                    rows: Vec::new(),
                });

                frames.len() - 1
            });

            frames[frame].rows.push(kept.len());
            kept.push(row);
        }

        if kept.is_empty() {
            return Err(LoadError::NoGridRows);
        }

        Ok(Self {
            rows: kept,
            frames,
            port_rows,
        })
    }

    /// Grid rows in file order
    pub fn rows(&self) -> &[EventRow] {
        &self.rows
    }

    /// Distinct times in first-seen order
    pub fn times(&self) -> impl Iterator<Item = f64> + '_ {
        self.frames.iter().map(|f| f.time)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Number of port rows that were dropped
    pub fn port_rows(&self) -> usize {
        self.port_rows
    }

    pub fn frame(&self, index: usize) -> Option<Frame<'_>> {
        let frame = self.frames.get(index)?;

        Some(Frame {
            index,
            time: frame.time,
            rows: frame.rows.iter().map(|&i| &self.rows[i]).collect(),
        })
    }

    pub fn frames(&self) -> impl Iterator<Item = Frame<'_>> {
        (0..self.frames.len()).filter_map(|i| self.frame(i))
    }
}

/// Reads delimited simulation logs.
///
/// The first line may declare the delimiter (`sep=;`), in which case it overrides the one the
/// reader was built with. The next line is the header, naming the columns. Fields follow the
/// usual CSV quoting rules, so a quoted field may contain the delimiter.
pub struct LogReader {
    delimiter: u8,
}

impl Default for LogReader {
    fn default() -> Self {
        Self { delimiter: b';' }
    }
}

impl LogReader {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }

    pub fn read_path(&self, path: &Path) -> Result<EventLog, LoadError> {
        let text = std::fs::read_to_string(path)?;

        self.read_str(&text)
    }

    pub fn read_str(&self, text: &str) -> Result<EventLog, LoadError> {
        let Some(table) = Table::find(text, self.delimiter)? else {
            return Err(LoadError::Empty);
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(table.delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(table.body.as_bytes());

        let headers = reader.headers()?.clone();
        if headers.iter().all(str::is_empty) {
            return Err(LoadError::Empty);
        }

        let columns = Columns::from_header(&headers)?;
        let mut rows = Vec::new();

        for record in reader.records() {
            let record = record?;

            // whitespace-only lines
            if record.len() == 1 && record[0].is_empty() {
                continue;
            }

            let line = record
                .position()
                .map_or(0, |p| table.first_line + p.line() as usize - 1);

            rows.push(columns.read_row(line, &record)?);
        }

        let log = EventLog::from_rows(rows)?;

        debug!(
            rows = log.rows().len(),
            frames = log.frame_count(),
            port_rows = log.port_rows(),
            "Loaded log"
        );

        Ok(log)
    }
}

/// The part of a log the CSV reader sees: everything from the header line on.
struct Table<'a> {
    delimiter: u8,
    body: &'a str,

    /// 1-based source line of the header
    first_line: usize,
}

impl<'a> Table<'a> {
    /// Skips leading blank lines and an optional `sep=` declaration. `None` if nothing is left.
    fn find(text: &'a str, delimiter: u8) -> Result<Option<Self>, LoadError> {
        let mut offset = 0;
        let mut delimiter = delimiter;
        let mut declared = false;

        for (i, line) in text.split_inclusive('\n').enumerate() {
            let start = offset;
            offset += line.len();

            if parse_util::trim_ws(line.as_bytes()).is_empty() {
                continue;
            }

            if !declared {
                if let Some(d) = read_declaration(line.as_bytes())? {
                    delimiter = d;
                    declared = true;
                    continue;
                }
            }

            return Ok(Some(Self {
                delimiter,
                body: &text[start..],
                first_line: i + 1,
            }));
        }

        Ok(None)
    }
}

/// Attempt to parse a `sep=<c>` line, otherwise returns `None`.
fn read_declaration(line: &[u8]) -> Result<Option<u8>, LoadError> {
    let line = parse_util::trim_ws(line);
    let Ok(rest) = parse_util::expect_slice(b"sep=", line) else {
        return Ok(None);
    };

    match parse_util::take_1(rest) {
        (Some(b), []) => Ok(Some(b)),
        _ => Err(LoadError::InvalidDelimiter {
            line: String::from_utf8_lossy(line).to_string(),
        }),
    }
}

/// Positions of the required columns
struct Columns {
    time: usize,
    coordinate: usize,
    payload: usize,
    port: usize,
}

impl Columns {
    fn from_header(header: &StringRecord) -> Result<Self, LoadError> {
        let find = |name: &'static str| {
            header
                .iter()
                .position(|n| n == name)
                .ok_or(LoadError::MissingColumn { name })
        };

        let [time, coordinate, payload, port] = REQUIRED_COLUMNS;

        Ok(Self {
            time: find(time)?,
            coordinate: find(coordinate)?,
            payload: find(payload)?,
            port: find(port)?,
        })
    }

    fn width(&self) -> usize {
        [self.time, self.coordinate, self.payload, self.port]
            .into_iter()
            .max()
            .unwrap_or_default()
            + 1
    }

    fn read_row(&self, line: usize, record: &StringRecord) -> Result<EventRow, LoadError> {
        let expected = self.width();
        if record.len() < expected {
            return Err(LoadError::ShortRow {
                line,
                expected,
                found: record.len(),
            });
        }

        let time = parse_util::convert::<f64>(record[self.time].as_bytes()).map_err(|_| {
            LoadError::InvalidTime {
                line,
                got: record[self.time].to_string(),
            }
        })?;

        let port_name = Some(&record[self.port])
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        Ok(EventRow {
            line,
            time,
            coordinate: record[self.coordinate].to_string(),
            port_name,
            payload: record[self.payload].to_string(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::LoadError;
    use super::LogReader;

    const CADMIUM_LOG: &str = "sep=;
time;model_id;model_name;port_name;data
0;1;(0,0);;<1>
0;2;(1,0);;<0>
0;3;top;out;<0>
1.5;1;(0,0);;<0>
";

    #[test]
    fn reads_declared_delimiter() {
        let log = LogReader::new(b',').read_str(CADMIUM_LOG).unwrap();

        assert_eq!(log.rows().len(), 3);
        assert_eq!(log.port_rows(), 1);
        assert_eq!(log.times().collect::<Vec<_>>(), vec![0.0, 1.5]);
    }

    #[test]
    fn header_without_declaration() {
        let text = "time;model_name;port_name;data\n2;(4,5);;<0,1>\n";
        let log = LogReader::default().read_str(text).unwrap();

        let row = &log.rows()[0];
        assert_eq!(row.line, 2);
        assert_eq!(row.time, 2.0);
        assert_eq!(row.coordinate, "(4,5)");
        assert_eq!(row.payload, "<0,1>");
        assert_eq!(row.port_name, None);
    }

    #[test]
    fn quoted_fields() {
        let text = "\"time\";\"model_name\";\"port_name\";\"data\"\n\"1\";\"(1,1)\";\"\";\"<1>\"\n";
        let log = LogReader::default().read_str(text).unwrap();

        assert_eq!(log.rows()[0].coordinate, "(1,1)");
        assert_eq!(log.rows()[0].payload, "<1>");
    }

    #[test]
    fn quoted_delimiter_stays_in_its_field() {
        let text = "time;model_id;model_name;port_name;data
0;\"cell;1\";(0,0);;<1>
1;2;(1,0);;<1>
";
        let log = LogReader::default().read_str(text).unwrap();

        assert_eq!(log.rows().len(), 2);
        assert_eq!(log.port_rows(), 0);
        assert_eq!(log.frame_count(), 2);
        assert_eq!(log.rows()[0].coordinate, "(0,0)");
    }

    #[test]
    fn lines_count_declaration_and_blanks() {
        let text = "\nsep=;\ntime;model_name;port_name;data\n0;(0,0);;<1>\n\n   \n1;(1,0);;<1>\n";
        let log = LogReader::default().read_str(text).unwrap();

        let lines: Vec<usize> = log.rows().iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![4, 7]);
    }

    #[test]
    fn frames_preserve_first_seen_order() {
        let text = "time;model_name;port_name;data
3;(0,0);;<1>
1;(0,0);;<0>
3;(1,0);;<1>
";
        let log = LogReader::default().read_str(text).unwrap();
        let frames: Vec<_> = log.frames().collect();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].time, 3.0);
        assert_eq!(frames[1].time, 1.0);

        let lines: Vec<usize> = frames[0].rows.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![2, 4]);
    }

    #[test]
    fn missing_column() {
        let text = "time;model_name;data\n0;(0,0);<1>\n";
        let err = LogReader::default().read_str(text).unwrap_err();

        assert!(matches!(err, LoadError::MissingColumn { name: "port_name" }));
    }

    #[test]
    fn wrong_delimiter_means_missing_columns() {
        let text = "time,model_name,port_name,data\n0,(0;0),,<1>\n";
        let err = LogReader::default().read_str(text).unwrap_err();

        assert!(matches!(err, LoadError::MissingColumn { name: "time" }));
    }

    #[test]
    fn invalid_declaration() {
        let err = LogReader::default().read_str("sep=\ntime\n").unwrap_err();
        assert!(matches!(err, LoadError::InvalidDelimiter { .. }));

        let err = LogReader::default().read_str("sep=;;\ntime\n").unwrap_err();
        assert!(matches!(err, LoadError::InvalidDelimiter { .. }));
    }

    #[test]
    fn empty_inputs() {
        assert!(matches!(
            LogReader::default().read_str("\n \n"),
            Err(LoadError::Empty)
        ));
        assert!(matches!(
            LogReader::default().read_str("sep=;\n"),
            Err(LoadError::Empty)
        ));
        assert!(matches!(
            LogReader::default().read_str("time;model_name;port_name;data\n"),
            Err(LoadError::NoGridRows)
        ));
    }

    #[test]
    fn row_errors_carry_line() {
        let text = "time;model_name;port_name;data\n0;(0,0);;<1>\nsoon;(0,0);;<1>\n";
        let err = LogReader::default().read_str(text).unwrap_err();
        assert!(matches!(err, LoadError::InvalidTime { line: 3, .. }));

        let text = "time;model_name;port_name;data\n0;(0,0)\n";
        let err = LogReader::default().read_str(text).unwrap_err();
        assert!(matches!(
            err,
            LoadError::ShortRow {
                line: 2,
                expected: 4,
                found: 2
            }
        ));
    }

    #[test]
    fn negative_zero_shares_frame() {
        let text = "time;model_name;port_name;data\n0;(0,0);;<1>\n-0;(1,0);;<1>\n";
        let log = LogReader::default().read_str(text).unwrap();

        assert_eq!(log.frame_count(), 1);
    }
}
