//! Cohort CSV ingest.
//!
//! Turns the uncensored and censored sample tables into a validated [`Cohort`].
//!
//! Design goals:
//! - **Strict schema** for the id, outcome and feature columns (exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Metadata never leaks into features**: id, outcome and age columns and
//!   the known lab metadata columns are always excluded, and columns with no
//!   numeric cell are dropped (and reported)

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use log::{info, warn};
use serde::Serialize;

use crate::domain::{group_of, Cohort, Sample, DEFAULT_GROUP_SEPARATOR};
use crate::error::AppError;

/// Lab metadata columns that are never features (matched case-insensitively).
pub const METADATA_COLUMNS: &[&str] = &["MiceName", "Cage", "DeathDate", "DateOfBirth", "Gender", "Group"];

/// Where to read from and how to interpret the tables.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub uncensored: PathBuf,
    pub censored: PathBuf,
    /// Keep only rows whose age column equals this value.
    pub age_filter: Option<String>,
    /// Outcome column name; default is the first column containing `diff`.
    pub outcome_column: Option<String>,
    /// Age column name; default is the first column containing `Age`.
    pub age_column: Option<String>,
    pub group_separator: char,
    /// Extra non-feature columns.
    pub exclude_columns: Vec<String>,
}

impl IngestOptions {
    pub fn new(uncensored: impl Into<PathBuf>, censored: impl Into<PathBuf>) -> Self {
        Self {
            uncensored: uncensored.into(),
            censored: censored.into(),
            age_filter: None,
            outcome_column: None,
            age_column: None,
            group_separator: DEFAULT_GROUP_SEPARATOR,
            exclude_columns: Vec::new(),
        }
    }
}

/// Row counts per population.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub uncensored_rows_read: usize,
    pub censored_rows_read: usize,
    pub filtered_by_age: usize,
    pub dropped_missing_outcome: usize,
    pub uncensored_used: usize,
    pub censored_used: usize,
    pub groups: usize,
    pub feature_count: usize,
    /// Candidate feature columns dropped because none of their cells is numeric.
    pub dropped_columns: Vec<String>,
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub file: PathBuf,
    pub line: usize,
    pub id: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct IngestedCohort {
    pub cohort: Cohort,
    pub stats: IngestStats,
    pub row_errors: Vec<RowError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Population {
    Uncensored,
    Censored,
}

/// Resolved column roles of one table.
#[derive(Debug, Clone)]
struct Layout {
    outcome: Option<usize>,
    age: Option<usize>,
    /// `(column index, sanitized name)` of every feature column.
    features: Vec<(usize, String)>,
}

struct Table {
    feature_names: Vec<String>,
    samples: Vec<Sample>,
    rows_read: usize,
    filtered_by_age: usize,
    dropped_missing_outcome: usize,
    row_errors: Vec<RowError>,
    dropped_columns: Vec<String>,
}

/// Load both populations and build the cohort.
pub fn load_cohort(opts: &IngestOptions) -> Result<IngestedCohort, AppError> {
    let uncensored = read_table(&opts.uncensored, opts, Population::Uncensored, &[])?;
    let mut censored = read_table(
        &opts.censored,
        opts,
        Population::Censored,
        &uncensored.dropped_columns,
    )?;

    align_features(&uncensored.feature_names, &mut censored, &opts.censored)?;

    if uncensored.samples.is_empty() {
        return Err(AppError::new(3, empty_table_message(&uncensored)));
    }

    let mut dropped_columns = uncensored.dropped_columns;
    for name in censored.dropped_columns {
        if !dropped_columns.contains(&name) {
            dropped_columns.push(name);
        }
    }

    let mut row_errors = uncensored.row_errors;
    row_errors.extend(censored.row_errors);
    for e in row_errors.iter().take(5) {
        warn!(
            "{}:{} {}: {}",
            e.file.display(),
            e.line,
            e.id.as_deref().unwrap_or("-"),
            e.message
        );
    }

    let cohort = Cohort::new(uncensored.feature_names, uncensored.samples, censored.samples)?;
    let stats = IngestStats {
        uncensored_rows_read: uncensored.rows_read,
        censored_rows_read: censored.rows_read,
        filtered_by_age: uncensored.filtered_by_age + censored.filtered_by_age,
        dropped_missing_outcome: uncensored.dropped_missing_outcome,
        uncensored_used: cohort.uncensored.len(),
        censored_used: cohort.censored.len(),
        groups: cohort.groups().len(),
        feature_count: cohort.feature_count(),
        dropped_columns,
    };

    if stats.dropped_missing_outcome > 0 {
        info!(
            "Removed {} uncensored samples with a missing outcome",
            stats.dropped_missing_outcome
        );
    }
    info!(
        "Loaded {} uncensored ({} cages) and {} censored samples, {} features",
        stats.uncensored_used, stats.groups, stats.censored_used, stats.feature_count
    );

    Ok(IngestedCohort {
        cohort,
        stats,
        row_errors,
    })
}

fn empty_table_message(table: &Table) -> String {
    let unparsed = table.row_errors.len();
    match table.row_errors.first() {
        Some(first) if unparsed == table.rows_read => format!(
            "All {unparsed} uncensored rows failed to parse (line {}: {}).",
            first.line, first.message
        ),
        _ => format!(
            "No uncensored samples remain after filtering ({} age-filtered, {} without outcome, {} unparseable).",
            table.filtered_by_age, table.dropped_missing_outcome, unparsed
        ),
    }
}

/// `also_drop` carries the columns already dropped from the uncensored table.
fn read_table(
    path: &Path,
    opts: &IngestOptions,
    population: Population,
    also_drop: &[String],
) -> Result<Table, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers of '{}': {e}", path.display())))?
        .clone();
    let names: Vec<String> = headers.iter().map(sanitize_column_name).collect();
    let mut layout = resolve_layout(&names, opts, population)
        .map_err(|msg| AppError::new(2, format!("{}: {msg}", path.display())))?;

    let mut table = Table {
        feature_names: Vec::new(),
        samples: Vec::new(),
        rows_read: 0,
        filtered_by_age: 0,
        dropped_missing_outcome: 0,
        row_errors: Vec::new(),
        dropped_columns: Vec::new(),
    };

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        table.rows_read += 1;
        match result {
            Ok(record) => records.push((line, record)),
            Err(e) => table.row_errors.push(RowError {
                file: path.to_path_buf(),
                line,
                id: None,
                message: format!("CSV parse error: {e}"),
            }),
        }
    }

    table.dropped_columns = drop_non_numeric(&mut layout, &records, also_drop);
    if layout.features.is_empty() {
        return Err(AppError::new(
            2,
            format!("{}: no numeric feature columns.", path.display()),
        ));
    }
    if !table.dropped_columns.is_empty() {
        info!(
            "{}: dropped non-numeric columns: {}",
            path.display(),
            table.dropped_columns.join(", ")
        );
    }
    table.feature_names = layout.features.iter().map(|(_, n)| n.clone()).collect();

    for (line, record) in &records {
        match parse_row(record, &layout, opts, population) {
            Ok(RowOutcome::Keep(sample)) => table.samples.push(sample),
            Ok(RowOutcome::FilteredByAge) => table.filtered_by_age += 1,
            Ok(RowOutcome::MissingOutcome) => table.dropped_missing_outcome += 1,
            Err((id, message)) => table.row_errors.push(RowError {
                file: path.to_path_buf(),
                line: *line,
                id,
                message,
            }),
        }
    }

    Ok(table)
}

/// Remove feature columns without a single numeric cell, plus those in `also_drop`.
///
/// A column with one bad cell among numbers stays and the row is reported.
fn drop_non_numeric(layout: &mut Layout, records: &[(usize, StringRecord)], also_drop: &[String]) -> Vec<String> {
    let mut dropped = Vec::new();
    layout.features.retain(|(i, name)| {
        let keep = !also_drop.contains(name)
            && (records.is_empty()
                || records
                    .iter()
                    .any(|(_, r)| parse_opt_f64(get_value(r, *i)).is_some()));
        if !keep {
            dropped.push(name.clone());
        }
        keep
    });
    dropped
}

enum RowOutcome {
    Keep(Sample),
    FilteredByAge,
    MissingOutcome,
}

fn parse_row(
    record: &StringRecord,
    layout: &Layout,
    opts: &IngestOptions,
    population: Population,
) -> Result<RowOutcome, (Option<String>, String)> {
    let id = get_value(record, 0)
        .ok_or_else(|| (None, "Missing sample id.".to_string()))?
        .to_string();

    let age = layout.age.and_then(|i| get_value(record, i)).map(str::to_string);
    if let Some(filter) = &opts.age_filter {
        if !age_matches(age.as_deref(), filter) {
            return Ok(RowOutcome::FilteredByAge);
        }
    }

    let outcome = layout.outcome.and_then(|i| parse_opt_f64(get_value(record, i)));
    if population == Population::Uncensored && outcome.is_none() {
        return Ok(RowOutcome::MissingOutcome);
    }

    let mut features = Vec::with_capacity(layout.features.len());
    for (i, name) in &layout.features {
        let raw = get_value(record, *i)
            .ok_or_else(|| (Some(id.clone()), format!("Missing value for feature `{name}`.")))?;
        let v = raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| (Some(id.clone()), format!("Invalid value '{raw}' for feature `{name}`.")))?;
        features.push(v);
    }

    Ok(RowOutcome::Keep(Sample {
        group: group_of(&id, opts.group_separator),
        id,
        age,
        outcome,
        features,
    }))
}

fn resolve_layout(names: &[String], opts: &IngestOptions, population: Population) -> Result<Layout, String> {
    if names.is_empty() {
        return Err("CSV has no columns.".to_string());
    }

    let outcome = match &opts.outcome_column {
        Some(name) => find_named(names, name),
        None => find_first(names, |n| n.to_lowercase().contains("diff")),
    };
    if outcome.is_none() && population == Population::Uncensored {
        return Err(match &opts.outcome_column {
            Some(name) => format!("Missing outcome column `{}`.", sanitize_column_name(name)),
            None => "No outcome column found (expected a column containing `diff`).".to_string(),
        });
    }

    let age = match &opts.age_column {
        Some(name) => find_named(names, name),
        None => find_first(names, |n| n.contains("Age")),
    };
    if age.is_none() && opts.age_filter.is_some() {
        return Err("Age filter requires an age column (a column containing `Age`).".to_string());
    }

    let excluded: Vec<String> = opts.exclude_columns.iter().map(|c| sanitize_column_name(c)).collect();
    let features = names
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(i, name)| {
            Some(*i) != outcome
                && Some(*i) != age
                && !is_metadata(name)
                && !excluded.contains(*name)
        })
        .map(|(i, name)| (i, name.clone()))
        .collect::<Vec<_>>();
    if features.is_empty() {
        return Err("No feature columns left after removing metadata columns.".to_string());
    }

    let mut seen = HashSet::new();
    if let Some((_, dup)) = features.iter().find(|(_, n)| !seen.insert(n.as_str())) {
        return Err(format!("Duplicate feature column `{dup}` after sanitizing headers."));
    }

    Ok(Layout {
        outcome,
        age,
        features,
    })
}

/// Reorder censored feature values to the uncensored column order.
fn align_features(reference: &[String], censored: &mut Table, path: &Path) -> Result<(), AppError> {
    if censored.feature_names == reference {
        return Ok(());
    }

    let position: HashMap<&str, usize> = censored
        .feature_names
        .iter()
        .enumerate()
        .map(|(i, n)| (n.as_str(), i))
        .collect();
    let mut order = Vec::with_capacity(reference.len());
    for name in reference {
        let i = position.get(name.as_str()).ok_or_else(|| {
            AppError::new(
                2,
                format!("{}: missing feature column `{name}`.", path.display()),
            )
        })?;
        order.push(*i);
    }
    if censored.feature_names.len() != reference.len() {
        let extra: Vec<&str> = censored
            .feature_names
            .iter()
            .filter(|n| !reference.contains(*n))
            .map(String::as_str)
            .collect();
        return Err(AppError::new(
            2,
            format!("{}: unexpected feature columns: {}", path.display(), extra.join(", ")),
        ));
    }

    for s in &mut censored.samples {
        s.features = order.iter().map(|&i| s.features[i]).collect();
    }
    censored.feature_names = reference.to_vec();
    Ok(())
}

/// Replace every character outside `[A-Za-z0-9_]` with `_`, after trimming
/// whitespace and a UTF-8 BOM.
pub fn sanitize_column_name(name: &str) -> String {
    name.trim()
        .trim_start_matches('\u{feff}')
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

fn is_metadata(name: &str) -> bool {
    METADATA_COLUMNS.iter().any(|m| name.eq_ignore_ascii_case(m))
}

fn find_named(names: &[String], wanted: &str) -> Option<usize> {
    let wanted = sanitize_column_name(wanted);
    names.iter().skip(1).position(|n| *n == wanted).map(|i| i + 1)
}

fn find_first(names: &[String], pred: impl Fn(&str) -> bool) -> Option<usize> {
    names.iter().skip(1).position(|n| pred(n.as_str())).map(|i| i + 1)
}

/// Numeric comparison when both sides parse, trimmed string comparison otherwise.
fn age_matches(value: Option<&str>, filter: &str) -> bool {
    let Some(value) = value else { return false };
    match (value.trim().parse::<f64>(), filter.trim().parse::<f64>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => value.trim() == filter.trim(),
    }
}

fn get_value(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_opt_f64(s: Option<&str>) -> Option<f64> {
    let v = s?.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}
