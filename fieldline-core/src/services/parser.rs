//! CSV parser - snapshot export text to flat records
//!
//! The export format is line based: a newline always ends a row. A `"`
//! toggles the quoted state, commas inside quotes are kept, and doubled
//! quotes are *not* unescaped. That last point matches how earlier exports
//! were read and must not change, otherwise stored values would drift.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::HeaderMappings;
use crate::domain::result::{Error, Result};
use crate::domain::{CanonicalField, Record};

/// Split one line into trimmed cells
pub fn split_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                cells.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

/// Which column feeds each canonical field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderBinding {
    columns: BTreeMap<CanonicalField, usize>,
}

impl HeaderBinding {
    /// Bind header columns to canonical fields.
    ///
    /// A column binds when its header contains one of the field's keys.
    /// When several columns match a field, the right-most one wins.
    pub fn resolve(headers: &[String], mappings: &HeaderMappings) -> Self {
        let mut columns = BTreeMap::new();
        for (index, header) in headers.iter().enumerate() {
            for (field, keys) in mappings.iter() {
                if keys.iter().any(|key| !key.is_empty() && header.contains(key.as_str())) {
                    columns.insert(*field, index);
                }
            }
        }
        Self { columns }
    }

    pub fn column(&self, field: CanonicalField) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    /// Canonical fields no header column matched
    pub fn unbound(&self) -> Vec<CanonicalField> {
        CanonicalField::ALL
            .into_iter()
            .filter(|f| !self.columns.contains_key(f))
            .collect()
    }
}

/// Outcome of parsing one data row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Valid(Record),
    /// Row without a non-empty identifier; dropped but counted
    MissingIdentifier { line: usize },
}

/// Parser configured with a header dictionary
#[derive(Debug, Clone, Default)]
pub struct CsvParser {
    mappings: HeaderMappings,
}

impl CsvParser {
    pub fn new(mappings: HeaderMappings) -> Self {
        Self { mappings }
    }

    /// Start iterating the rows of `text`.
    ///
    /// Fails with `SourceUnreadable` when there is no header row or no
    /// header binds to the identifier field. Calling this again on the same
    /// text yields the same rows.
    pub fn rows<'a>(&self, text: &'a str) -> Result<Rows<'a>> {
        let mut lines = text.lines().enumerate();
        let headers = loop {
            match lines.next() {
                Some((_, line)) if line.trim().is_empty() => continue,
                Some((_, line)) => break split_line(line),
                None => return Err(Error::unreadable("no header row")),
            }
        };

        let binding = HeaderBinding::resolve(&headers, &self.mappings);
        if binding.column(CanonicalField::Identifier).is_none() {
            return Err(Error::unreadable(format!(
                "no column matches identifier headers {:?}",
                self.mappings.keys(CanonicalField::Identifier)
            )));
        }

        Ok(Rows {
            lines,
            binding,
            headers,
        })
    }

    /// Parse the whole text
    pub fn parse(&self, text: &str) -> Result<ParsedCsv> {
        let rows = self.rows(text)?;
        let headers = rows.headers().to_vec();
        let binding = rows.binding().clone();

        let mut records = Vec::new();
        let mut invalid_lines = Vec::new();
        for outcome in rows {
            match outcome {
                RowOutcome::Valid(record) => records.push(record),
                RowOutcome::MissingIdentifier { line } => {
                    tracing::debug!(
                        "{}",
                        Error::MalformedRow {
                            line,
                            reason: "missing identifier".to_string(),
                        }
                    );
                    invalid_lines.push(line);
                }
            }
        }

        tracing::debug!(
            valid = records.len(),
            invalid = invalid_lines.len(),
            "Parsed CSV"
        );

        Ok(ParsedCsv {
            headers,
            binding,
            records,
            invalid_lines,
        })
    }
}

/// Iterator over the data rows of one CSV text
pub struct Rows<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
    binding: HeaderBinding,
    headers: Vec<String>,
}

impl Rows<'_> {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn binding(&self) -> &HeaderBinding {
        &self.binding
    }

    fn build(&self, cells: &[String]) -> Record {
        let mut record = Record::default();
        for field in CanonicalField::ALL {
            let value = self
                .binding
                .column(field)
                .and_then(|i| cells.get(i))
                .cloned()
                .unwrap_or_default();
            record.set(field, value);
        }
        record
    }
}

impl Iterator for Rows<'_> {
    type Item = RowOutcome;

    fn next(&mut self) -> Option<RowOutcome> {
        loop {
            let (index, line) = self.lines.next()?;
            if line.trim().is_empty() {
                continue;
            }
            let record = self.build(&split_line(line));
            // 1-based line numbers, as an editor would show them
            let line = index + 1;
            return Some(if record.identifier.is_empty() {
                RowOutcome::MissingIdentifier { line }
            } else {
                RowOutcome::Valid(record)
            });
        }
    }
}

/// Fully parsed CSV
#[derive(Debug, Clone)]
pub struct ParsedCsv {
    pub headers: Vec<String>,
    pub binding: HeaderBinding,
    /// Valid rows in file order (within-file duplicates included)
    pub records: Vec<Record>,
    /// Line numbers of rows dropped for a missing identifier
    pub invalid_lines: Vec<usize>,
}

impl ParsedCsv {
    /// Non-blank data rows
    pub fn total_rows(&self) -> usize {
        self.records.len() + self.invalid_lines.len()
    }
}
