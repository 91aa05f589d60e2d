//! MySQL DDL parsing for column order extraction.
//!
//! Only the column names of a CREATE TABLE statement are extracted, in
//! declaration order. Keys, indexes and constraints are skipped.

use once_cell::sync::Lazy;
use regex::Regex;

/// Regex to extract table name from CREATE TABLE
/// Supports: `table`, table, `schema`.`table`
static CREATE_TABLE_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)CREATE\s+(?:TEMPORARY\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?(?:[`"\w]+\s*\.\s*)*[`"]?([^`"\s(]+)[`"]?"#)
        .unwrap()
});

/// Regex for column definition
/// Supports: `column` (MySQL), "column" (ANSI), column (unquoted)
static COLUMN_DEF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*(?:`((?:[^`]|``)+)`|"([^"]+)"|([^`"\s,]+))\s+\w+"#).unwrap());

/// Body entries that are not column definitions
const CONSTRAINT_PREFIXES: [&str; 10] = [
    "PRIMARY KEY",
    "CONSTRAINT",
    "FOREIGN KEY",
    "KEY ",
    "INDEX ",
    "UNIQUE ",
    "FULLTEXT ",
    "SPATIAL ",
    "CHECK ",
    "PERIOD ",
];

/// Table name and ordered column names of a CREATE TABLE statement
pub fn parse_create_table(stmt: &str) -> Option<(String, Vec<String>)> {
    let table_name = extract_create_table_name(stmt)?;
    let body = extract_table_body(stmt)?;

    let columns: Vec<String> = split_table_body(&body)
        .iter()
        .filter(|part| !is_constraint(part))
        .filter_map(|part| parse_column_name(part))
        .collect();

    if columns.is_empty() {
        return None;
    }

    Some((table_name, columns))
}

pub fn extract_create_table_name(stmt: &str) -> Option<String> {
    CREATE_TABLE_NAME_RE
        .captures(stmt)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn is_constraint(part: &str) -> bool {
    let upper = part.trim_start().to_uppercase();
    CONSTRAINT_PREFIXES.iter().any(|p| upper.starts_with(p))
}

fn parse_column_name(def: &str) -> Option<String> {
    let caps = COLUMN_DEF_RE.captures(def)?;
    let name = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3))?;
    Some(name.as_str().replace("``", "`"))
}

/// Extract the body of a CREATE TABLE statement (between first ( and matching ))
fn extract_table_body(stmt: &str) -> Option<String> {
    let bytes = stmt.as_bytes();
    let mut depth = 0;
    let mut start = None;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, &b) in bytes.iter().enumerate() {
        if escape_next {
            escape_next = false;
            continue;
        }

        if b == b'\\' && in_string {
            escape_next = true;
            continue;
        }

        if b == b'\'' {
            in_string = !in_string;
            continue;
        }

        if in_string {
            continue;
        }

        if b == b'(' {
            if depth == 0 {
                start = Some(i + 1);
            }
            depth += 1;
        } else if b == b')' && depth > 0 {
            depth -= 1;
            if depth == 0 {
                return start.map(|s| stmt[s..i].to_string());
            }
        }
    }

    None
}

/// Split table body by commas, respecting nested parentheses and strings
fn split_table_body(body: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for ch in body.chars() {
        if escape_next {
            current.push(ch);
            escape_next = false;
            continue;
        }

        if ch == '\\' && in_string {
            current.push(ch);
            escape_next = true;
            continue;
        }

        if ch == '\'' {
            in_string = !in_string;
            current.push(ch);
            continue;
        }

        if in_string {
            current.push(ch);
            continue;
        }

        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }

    parts
}
