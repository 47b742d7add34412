//! JSON and CSV backups of matches, teams and groups.
use crate::{Group, MatchWithSport, Team};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            ExportFormat::Json => ExportFormat::Csv,
            ExportFormat::Csv => ExportFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportEntity {
    Matches,
    Teams,
    Groups,
}

impl ExportEntity {
    pub const ALL: [ExportEntity; 3] = [ExportEntity::Matches, ExportEntity::Teams, ExportEntity::Groups];

    pub fn name(&self) -> &'static str {
        match self {
            ExportEntity::Matches => "matches",
            ExportEntity::Teams => "teams",
            ExportEntity::Groups => "groups",
        }
    }
}

/// Everything a backup covers, as currently loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportSet {
    pub matches: Vec<MatchWithSport>,
    pub teams: Vec<Team>,
    pub groups: Vec<Group>,
}

impl ExportSet {
    fn len_of(&self, entity: ExportEntity) -> usize {
        match entity {
            ExportEntity::Matches => self.matches.len(),
            ExportEntity::Teams => self.teams.len(),
            ExportEntity::Groups => self.groups.len(),
        }
    }

    fn render(&self, entity: ExportEntity, format: ExportFormat) -> Result<String, ExportError> {
        match (entity, format) {
            (ExportEntity::Matches, ExportFormat::Json) => to_json(&self.matches),
            (ExportEntity::Teams, ExportFormat::Json) => to_json(&self.teams),
            (ExportEntity::Groups, ExportFormat::Json) => to_json(&self.groups),
            (ExportEntity::Matches, ExportFormat::Csv) => to_csv(&self.matches),
            (ExportEntity::Teams, ExportFormat::Csv) => to_csv(&self.teams),
            (ExportEntity::Groups, ExportFormat::Csv) => to_csv(&self.groups),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub filename: String,
    pub contents: String,
}

#[derive(Debug)]
pub enum ExportError {
    /// Nothing to export for this entity.
    Empty(ExportEntity),
    Serialize(serde_json::Error),
    /// A row did not serialize to a JSON object, so it has no columns.
    NotTabular,
    Io(std::io::Error, PathBuf),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Empty(entity) => write!(f, "No {} data to export", entity.name()),
            ExportError::Serialize(e) => write!(f, "Export serialization failed: {e}"),
            ExportError::NotTabular => write!(f, "Rows cannot be written as CSV"),
            ExportError::Io(e, path) => write!(f, "Could not write {}: {e}", path.display()),
        }
    }
}

impl std::error::Error for ExportError {}

impl From<serde_json::Error> for ExportError {
    fn from(e: serde_json::Error) -> Self {
        ExportError::Serialize(e)
    }
}

pub fn to_json<T: Serialize>(rows: &[T]) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(rows)?)
}

/// Header row from the first row's field names, one line per row, `\n`
/// separated. Nested values are written as JSON text.
pub fn to_csv<T: Serialize>(rows: &[T]) -> Result<String, ExportError> {
    let rows: Vec<Map<String, Value>> = rows
        .iter()
        .map(|row| match serde_json::to_value(row)? {
            Value::Object(map) => Ok(map),
            _ => Err(ExportError::NotTabular),
        })
        .collect::<Result<_, _>>()?;

    let Some(first) = rows.first() else {
        return Ok(String::new());
    };
    let headers: Vec<&String> = first.keys().collect();

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        headers
            .iter()
            .map(|h| csv_escape(h))
            .collect::<Vec<_>>()
            .join(","),
    );
    for row in &rows {
        let fields: Vec<String> = headers
            .iter()
            .map(|h| csv_escape(&csv_text(row.get(h.as_str()))))
            .collect();
        lines.push(fields.join(","));
    }
    Ok(lines.join("\n"))
}

fn csv_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

pub fn backup_filename(stem: &str, format: ExportFormat, date: NaiveDate) -> String {
    format!("{stem}_backup_{}.{}", date.format("%Y-%m-%d"), format.extension())
}

pub fn export_entity(
    set: &ExportSet,
    entity: ExportEntity,
    format: ExportFormat,
    date: NaiveDate,
) -> Result<ExportFile, ExportError> {
    if set.len_of(entity) == 0 {
        return Err(ExportError::Empty(entity));
    }
    Ok(ExportFile {
        filename: backup_filename(entity.name(), format, date),
        contents: set.render(entity, format)?,
    })
}

/// JSON: one `full_backup_<date>.json` with every entity and an
/// `exportedAt` stamp. CSV: one file per entity that has rows.
pub fn export_all(
    set: &ExportSet,
    format: ExportFormat,
    now: DateTime<Utc>,
) -> Result<Vec<ExportFile>, ExportError> {
    let date = now.date_naive();
    match format {
        ExportFormat::Json => {
            let all = json!({
                "matches": set.matches,
                "teams": set.teams,
                "groups": set.groups,
                "exportedAt": now.to_rfc3339_opts(SecondsFormat::Millis, true),
            });
            Ok(vec![ExportFile {
                filename: backup_filename("full", ExportFormat::Json, date),
                contents: serde_json::to_string_pretty(&all)?,
            }])
        }
        ExportFormat::Csv => ExportEntity::ALL
            .into_iter()
            .filter(|entity| set.len_of(*entity) > 0)
            .map(|entity| export_entity(set, entity, ExportFormat::Csv, date))
            .collect(),
    }
}

pub fn write_files(dir: &Path, files: &[ExportFile]) -> Result<Vec<PathBuf>, ExportError> {
    std::fs::create_dir_all(dir).map_err(|e| ExportError::Io(e, dir.to_path_buf()))?;
    files
        .iter()
        .map(|file| {
            let path = dir.join(&file.filename);
            std::fs::write(&path, &file.contents).map_err(|e| ExportError::Io(e, path.clone()))?;
            Ok(path)
        })
        .collect()
}
