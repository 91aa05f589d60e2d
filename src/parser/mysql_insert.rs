//! MySQL INSERT statement parser.
//!
//! Parses one dump line of the form
//! `INSERT [modifiers] [INTO] table [(col, ...)] VALUES (row), (row) [tail];`
//! into an [`InsertStatement`] and renders it back to canonical SQL.

use super::{is_whitespace, Ident, Literal, TableName};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("sql parser error at byte {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

/// A parsed `INSERT ... VALUES` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    /// The line the statement was parsed from, byte-for-byte
    pub source: Vec<u8>,
    /// Keywords between `INSERT` and `INTO` (e.g. `IGNORE`), uppercased
    pub modifiers: Vec<String>,
    pub table: TableName,
    /// Explicit column list; `None` when the statement relies on table order
    pub columns: Option<Vec<Ident>>,
    pub rows: Vec<Vec<Literal>>,
    /// Trailing clause after the last row (e.g. `ON DUPLICATE KEY UPDATE ...`)
    pub tail: Option<Vec<u8>>,
}

impl InsertStatement {
    /// Unqualified table name used for rule lookup
    pub fn table_name(&self) -> &str {
        &self.table.name.value
    }

    /// Number of values per row
    pub fn arity(&self) -> Option<usize> {
        match self.columns {
            Some(ref cols) => Some(cols.len()),
            None => self.rows.first().map(Vec::len),
        }
    }

    /// Render canonical SQL, terminated by `;`.
    pub fn to_sql(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.source.len() + 16);

        out.extend_from_slice(b"INSERT ");
        for modifier in &self.modifiers {
            out.extend_from_slice(modifier.as_bytes());
            out.push(b' ');
        }
        out.extend_from_slice(b"INTO ");
        out.extend_from_slice(self.table.to_string().as_bytes());

        if let Some(ref columns) = self.columns {
            out.extend_from_slice(b" (");
            for (i, col) in columns.iter().enumerate() {
                if i > 0 {
                    out.extend_from_slice(b", ");
                }
                out.extend_from_slice(col.to_string().as_bytes());
            }
            out.push(b')');
        }

        out.extend_from_slice(b" VALUES ");
        for (row_idx, row) in self.rows.iter().enumerate() {
            if row_idx > 0 {
                out.extend_from_slice(b", ");
            }
            out.push(b'(');
            for (col_idx, value) in row.iter().enumerate() {
                if col_idx > 0 {
                    out.extend_from_slice(b", ");
                }
                value.write_sql(&mut out);
            }
            out.push(b')');
        }

        if let Some(ref tail) = self.tail {
            out.push(b' ');
            out.extend_from_slice(tail);
        }

        out.push(b';');
        out
    }
}

const MODIFIERS: [&[u8]; 4] = [b"LOW_PRIORITY", b"DELAYED", b"HIGH_PRIORITY", b"IGNORE"];

/// Byte-cursor parser over a single INSERT line
pub struct InsertParser<'a> {
    stmt: &'a [u8],
    pos: usize,
}

impl<'a> InsertParser<'a> {
    pub fn new(stmt: &'a [u8]) -> Self {
        Self { stmt, pos: 0 }
    }

    pub fn parse(mut self) -> Result<InsertStatement, ParseError> {
        self.skip_whitespace();
        if !self.eat_keyword(b"INSERT") {
            return Err(self.error("expected INSERT"));
        }

        let mut modifiers = Vec::new();
        loop {
            self.skip_whitespace();
            let found = MODIFIERS.iter().copied().find(|kw| self.peek_keyword(kw));
            match found {
                Some(kw) => {
                    self.pos += kw.len();
                    modifiers.push(String::from_utf8_lossy(kw).into_owned());
                }
                None => break,
            }
        }

        self.skip_whitespace();
        self.eat_keyword(b"INTO");
        self.skip_whitespace();

        let table = self.parse_table_name()?;
        self.skip_whitespace();

        let columns = if self.peek() == Some(b'(') {
            Some(self.parse_column_list()?)
        } else {
            None
        };

        self.skip_whitespace();
        if !self.eat_keyword(b"VALUES") && !self.eat_keyword(b"VALUE") {
            return Err(self.error("expected VALUES"));
        }

        let mut rows = Vec::new();
        loop {
            self.skip_whitespace();
            rows.push(self.parse_row()?);
            self.skip_whitespace();
            if self.peek() == Some(b',') {
                self.pos += 1;
            } else {
                break;
            }
        }

        let tail = self.parse_tail();

        let expected = columns.as_ref().map_or(rows[0].len(), Vec::len);
        if let Some(idx) = rows.iter().position(|r| r.len() != expected) {
            return Err(ParseError {
                message: format!(
                    "row {} has {} values, expected {}",
                    idx + 1,
                    rows[idx].len(),
                    expected
                ),
                position: self.pos,
            });
        }

        Ok(InsertStatement {
            source: self.stmt.to_vec(),
            modifiers,
            table,
            columns,
            rows,
            tail,
        })
    }

    fn parse_table_name(&mut self) -> Result<TableName, ParseError> {
        let first = self.parse_ident()?;
        if self.peek() == Some(b'.') {
            self.pos += 1;
            let name = self.parse_ident()?;
            return Ok(TableName {
                schema: Some(first),
                name,
            });
        }
        Ok(TableName {
            schema: None,
            name: first,
        })
    }

    /// Parse `(col1, col2, ...)`
    fn parse_column_list(&mut self) -> Result<Vec<Ident>, ParseError> {
        self.pos += 1; // Skip '('
        let mut columns = Vec::new();

        loop {
            self.skip_whitespace();
            columns.push(self.parse_ident()?);
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b')') => {
                    self.pos += 1;
                    return Ok(columns);
                }
                _ => return Err(self.error("expected ',' or ')' in column list")),
            }
        }
    }

    fn parse_ident(&mut self) -> Result<Ident, ParseError> {
        match self.peek() {
            Some(b'`') => {
                self.pos += 1;
                let mut value = Vec::new();
                while let Some(b) = self.peek() {
                    self.pos += 1;
                    if b == b'`' {
                        if self.peek() == Some(b'`') {
                            value.push(b'`');
                            self.pos += 1;
                        } else {
                            return Ok(Ident::quoted(String::from_utf8_lossy(&value)));
                        }
                    } else {
                        value.push(b);
                    }
                }
                Err(self.error("unterminated quoted identifier"))
            }
            Some(b) if is_ident_byte(b) => {
                let start = self.pos;
                while self.peek().is_some_and(is_ident_byte) {
                    self.pos += 1;
                }
                Ok(Ident::new(String::from_utf8_lossy(
                    &self.stmt[start..self.pos],
                )))
            }
            _ => Err(self.error("expected identifier")),
        }
    }

    /// Parse a single row "(val1, val2, ...)"
    fn parse_row(&mut self) -> Result<Vec<Literal>, ParseError> {
        if self.peek() != Some(b'(') {
            return Err(self.error("expected '(' to start row"));
        }
        self.pos += 1;

        let mut values = Vec::new();
        loop {
            self.skip_whitespace();
            if values.is_empty() && self.peek() == Some(b')') {
                self.pos += 1;
                return Ok(values);
            }

            values.push(self.parse_value()?);
            self.skip_whitespace();

            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b')') => {
                    self.pos += 1;
                    return Ok(values);
                }
                _ => return Err(self.error("expected ',' or ')' in row")),
            }
        }
    }

    /// Parse a single value (string, number, NULL, etc.)
    fn parse_value(&mut self) -> Result<Literal, ParseError> {
        match self.peek() {
            None => Err(self.error("unexpected end of statement")),
            Some(q @ (b'\'' | b'"')) => self.parse_string_value(q),
            Some(_) if self.peek_keyword_at_value_end(b"NULL") => {
                self.pos += 4;
                Ok(Literal::Null)
            }
            Some(_) => self.parse_other_value(),
        }
    }

    /// Parse a quoted string literal, decoding MySQL escape sequences
    fn parse_string_value(&mut self, quote: u8) -> Result<Literal, ParseError> {
        let start = self.pos;
        self.pos += 1; // Skip opening quote

        let mut value = Vec::new();

        while let Some(b) = self.peek() {
            if b == b'\\' {
                let Some(next) = self.stmt.get(self.pos + 1).copied() else {
                    break;
                };
                match next {
                    b'n' => value.push(b'\n'),
                    b'r' => value.push(b'\r'),
                    b't' => value.push(b'\t'),
                    b'b' => value.push(0x08),
                    b'0' => value.push(0),
                    b'Z' => value.push(0x1a),
                    // LIKE wildcards keep their backslash
                    b'%' | b'_' => {
                        value.push(b'\\');
                        value.push(next);
                    }
                    _ => value.push(next),
                }
                self.pos += 2;
            } else if b == quote {
                if self.stmt.get(self.pos + 1) == Some(&quote) {
                    value.push(quote);
                    self.pos += 2;
                } else {
                    self.pos += 1;
                    return Ok(Literal::String(value));
                }
            } else {
                value.push(b);
                self.pos += 1;
            }
        }

        Err(ParseError {
            message: "unterminated string literal".to_string(),
            position: start,
        })
    }

    /// Parse an unquoted value up to the next top-level ',' or ')'
    ///
    /// Integers become [`Literal::Integer`]; everything else is kept verbatim
    /// as [`Literal::Other`].
    fn parse_other_value(&mut self) -> Result<Literal, ParseError> {
        let start = self.pos;
        let mut depth = 0usize;

        while let Some(b) = self.peek() {
            match b {
                b'\'' | b'"' => {
                    self.parse_string_value(b)?;
                    continue;
                }
                b'(' => depth += 1,
                b')' if depth == 0 => break,
                b')' => depth -= 1,
                b',' if depth == 0 => break,
                _ => {}
            }
            self.pos += 1;
        }

        let raw = trim_ascii_end(&self.stmt[start..self.pos]);
        if raw.is_empty() {
            return Err(self.error("expected value"));
        }

        if is_integer(raw) {
            return Ok(Literal::Integer(String::from_utf8_lossy(raw).into_owned()));
        }

        Ok(Literal::Other(raw.to_vec()))
    }

    /// Everything after the last row, minus the terminating `;`
    fn parse_tail(&mut self) -> Option<Vec<u8>> {
        let rest = trim_ascii_end(&self.stmt[self.pos..]);
        let rest = rest.strip_suffix(b";").unwrap_or(rest);
        let rest = trim_ascii_end(super::trim_ascii_start(rest));
        self.pos = self.stmt.len();
        if rest.is_empty() {
            None
        } else {
            Some(rest.to_vec())
        }
    }

    fn peek(&self) -> Option<u8> {
        self.stmt.get(self.pos).copied()
    }

    fn peek_keyword(&self, keyword: &[u8]) -> bool {
        let end = self.pos + keyword.len();
        end <= self.stmt.len()
            && self.stmt[self.pos..end].eq_ignore_ascii_case(keyword)
            && !self.stmt.get(end).copied().is_some_and(is_ident_byte)
    }

    fn peek_keyword_at_value_end(&self, keyword: &[u8]) -> bool {
        if !self.peek_keyword(keyword) {
            return false;
        }
        let rest = super::trim_ascii_start(&self.stmt[self.pos + keyword.len()..]);
        matches!(rest.first(), Some(b',' | b')'))
    }

    fn eat_keyword(&mut self, keyword: &[u8]) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(is_whitespace) {
            self.pos += 1;
        }
    }

    fn error(&self, message: &str) -> ParseError {
        ParseError {
            message: message.to_string(),
            position: self.pos,
        }
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

fn is_integer(raw: &[u8]) -> bool {
    let digits = raw.strip_prefix(b"-").unwrap_or(raw);
    !digits.is_empty() && digits.iter().all(u8::is_ascii_digit)
}

fn trim_ascii_end(data: &[u8]) -> &[u8] {
    let end = data
        .iter()
        .rposition(|&b| !is_whitespace(b))
        .map_or(0, |p| p + 1);
    &data[..end]
}

/// Parse one INSERT line
pub fn parse_insert(line: &[u8]) -> Result<InsertStatement, ParseError> {
    InsertParser::new(line).parse()
}
