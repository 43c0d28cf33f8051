use crate::KindredError;
use crate::config::RunConfig;
use chrono::NaiveDate;
use std::path::Path;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// An in-memory delimited table: a header row plus string cells.
#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn read_csv(path: &Path) -> Result<Table, KindredError> {
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
        let headers = reader.headers()?.iter().map(|h| h.to_string()).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(|cell| cell.to_string()).collect());
        }

        Ok(Table { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        &self.rows[row][col]
    }

    pub fn row(&self, row: usize) -> &[String] {
        &self.rows[row]
    }

    /// Write the table with extra columns appended on the right. Each extra
    /// column carries one cell per row, in row order.
    pub fn write_csv_with_columns(
        &self,
        path: &Path,
        extra_headers: &[String],
        extra_columns: &[Vec<String>],
    ) -> Result<(), KindredError> {
        debug_assert_eq!(extra_headers.len(), extra_columns.len());

        let mut writer = csv::Writer::from_path(path)?;

        let mut header_row: Vec<&str> = self.headers.iter().map(|h| h.as_str()).collect();
        header_row.extend(extra_headers.iter().map(|h| h.as_str()));
        writer.write_record(&header_row)?;

        for (i, row) in self.rows.iter().enumerate() {
            let mut record: Vec<&str> = row.iter().map(|cell| cell.as_str()).collect();
            for column in extra_columns {
                record.push(column[i].as_str());
            }
            writer.write_record(&record)?;
        }

        writer.flush().map_err(KindredError::Io)?;
        Ok(())
    }
}

/// Days since 1970-01-01 for a date cell, or None if no known format matches.
pub fn date_to_day_offset(cell: &str) -> Option<i64> {
    let trimmed = cell.trim();
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .map(|date| date.signed_duration_since(epoch).num_days())
}

/// Extract the numeric tolerance matrix: one row per record, one column per
/// tolerance field in config order, with the date column (if any) converted
/// to day offsets. Non-numeric cells are a configuration failure surfaced
/// here, before any clustering begins.
pub fn tolerance_matrix(table: &Table, config: &RunConfig) -> Result<Vec<Vec<f64>>, KindredError> {
    let mut columns = Vec::new();
    for (field, spec) in &config.tol_dict {
        let col = table.column_index(&spec.col_name).ok_or_else(|| {
            KindredError::Config(format!(
                "tolerance field '{}' names missing column '{}'",
                field, spec.col_name
            ))
        })?;
        let is_date = config.datevar.as_deref() == Some(spec.col_name.as_str());
        columns.push((col, is_date));
    }

    let mut matrix = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let mut values = Vec::with_capacity(columns.len());
        for &(col, is_date) in &columns {
            let cell = table.cell(row, col);
            let value = if is_date {
                date_to_day_offset(cell).ok_or_else(|| {
                    KindredError::Config(format!(
                        "unparseable date '{}' in column '{}' (row {})",
                        cell, table.headers[col], row
                    ))
                })? as f64
            } else {
                cell.trim().parse::<f64>().map_err(|_| {
                    KindredError::Config(format!(
                        "non-numeric value '{}' in tolerance column '{}' (row {})",
                        cell, table.headers[col], row
                    ))
                })?
            };
            values.push(value);
        }
        matrix.push(values);
    }

    Ok(matrix)
}
