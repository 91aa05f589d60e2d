pub mod mysql_insert;

pub use mysql_insert::{parse_insert, InsertParser, InsertStatement, ParseError};

use std::fmt;

/// Hard per-line capacity: mysqldump may emit a whole `max_allowed_packet`
/// (up to 1G) worth of rows as a single line.
pub const MAX_LINE_BYTES: usize = 1000 * 1024 * 1024;

pub const READ_BUFFER_SIZE: usize = 256 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementType {
    Unknown,
    CreateTable,
    Insert,
}

/// Cheap prefix classification of a single dump line.
///
/// `INSERT` must start the line (no leading whitespace) and be followed by
/// whitespace. `CREATE TABLE` may be indented.
pub fn classify_line(line: &[u8]) -> StatementType {
    if starts_with_keyword(line, b"INSERT") {
        return StatementType::Insert;
    }

    let trimmed = trim_ascii_start(line);
    if starts_with_keyword(trimmed, b"CREATE") {
        let rest = trim_ascii_start(&trimmed[6..]);
        let rest = skip_keyword(rest, b"TEMPORARY");
        if starts_with_keyword(rest, b"TABLE") {
            return StatementType::CreateTable;
        }
    }

    StatementType::Unknown
}

#[inline]
fn starts_with_keyword(data: &[u8], keyword: &[u8]) -> bool {
    data.len() > keyword.len()
        && data[..keyword.len()].eq_ignore_ascii_case(keyword)
        && is_whitespace(data[keyword.len()])
}

#[inline]
fn skip_keyword<'a>(data: &'a [u8], keyword: &[u8]) -> &'a [u8] {
    if starts_with_keyword(data, keyword) {
        trim_ascii_start(&data[keyword.len()..])
    } else {
        data
    }
}

#[inline]
pub(crate) fn trim_ascii_start(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|&b| !is_whitespace(b))
        .unwrap_or(data.len());
    &data[start..]
}

#[inline]
pub(crate) fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

/// A table or column identifier, remembering whether it was backtick-quoted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    pub value: String,
    pub quoted: bool,
}

impl Ident {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            quoted: false,
        }
    }

    pub fn quoted(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            quoted: true,
        }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quoted {
            write!(f, "`{}`", self.value.replace('`', "``"))
        } else {
            write!(f, "{}", self.value)
        }
    }
}

/// `[schema.]table`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    pub schema: Option<Ident>,
    pub name: Ident,
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref schema) = self.schema {
            write!(f, "{}.", schema)?;
        }
        write!(f, "{}", self.name)
    }
}

/// A scalar value from a row tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    /// `NULL`
    Null,
    /// Unescaped contents of a quoted string
    String(Vec<u8>),
    /// Optionally signed decimal integer, as written
    Integer(String),
    /// Anything else (floats, hex, booleans, `_binary '...'`, expressions), verbatim
    Other(Vec<u8>),
}

impl Literal {
    pub fn string(value: impl Into<Vec<u8>>) -> Self {
        Literal::String(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Literal::Null)
    }

    /// Append the SQL form of this literal to `out`.
    pub fn write_sql(&self, out: &mut Vec<u8>) {
        match self {
            Literal::Null => out.extend_from_slice(b"NULL"),
            Literal::String(value) => write_quoted_string(value, out),
            Literal::Integer(value) => out.extend_from_slice(value.as_bytes()),
            Literal::Other(raw) => out.extend_from_slice(raw),
        }
    }

    pub fn to_sql(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_sql(&mut out);
        out
    }
}

/// Single-quote a string with MySQL backslash escaping (the mysqldump style).
pub fn write_quoted_string(value: &[u8], out: &mut Vec<u8>) {
    out.reserve(value.len() + 2);
    out.push(b'\'');
    for &b in value {
        match b {
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'\'' => out.extend_from_slice(b"\\'"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            0 => out.extend_from_slice(b"\\0"),
            0x1a => out.extend_from_slice(b"\\Z"),
            _ => out.push(b),
        }
    }
    out.push(b'\'');
}

/// Whether `text` is a plain numeric literal that can be written unquoted.
pub fn is_numeric_literal(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    let (mantissa, exponent) = match digits.find(['e', 'E']) {
        Some(pos) => (&digits[..pos], Some(&digits[pos + 1..])),
        None => (digits, None),
    };

    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (mantissa, None),
    };

    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());

    if int_part.is_empty() && frac_part.map_or(true, str::is_empty) {
        return false;
    }
    if !all_digits(int_part) || !frac_part.map_or(true, all_digits) {
        return false;
    }

    match exponent {
        None => true,
        Some(exp) => {
            let exp = exp.strip_prefix(['+', '-']).unwrap_or(exp);
            !exp.is_empty() && all_digits(exp)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_insert() {
        assert_eq!(
            classify_line(b"INSERT INTO posts VALUES (1, 'test');"),
            StatementType::Insert
        );
        assert_eq!(
            classify_line(b"insert into posts values (1);"),
            StatementType::Insert
        );
        assert_eq!(
            classify_line(b"INSERT\tIGNORE INTO t VALUES (1);"),
            StatementType::Insert
        );
    }

    #[test]
    fn test_classify_not_insert() {
        assert_eq!(classify_line(b"-- comment"), StatementType::Unknown);
        assert_eq!(classify_line(b"INSERTED 5 rows"), StatementType::Unknown);
        assert_eq!(classify_line(b"  INSERT INTO t VALUES (1);"), StatementType::Unknown);
        assert_eq!(classify_line(b""), StatementType::Unknown);
        assert_eq!(classify_line(b"INSERT"), StatementType::Unknown);
    }

    #[test]
    fn test_classify_create_table() {
        assert_eq!(
            classify_line(b"CREATE TABLE `users` ("),
            StatementType::CreateTable
        );
        assert_eq!(
            classify_line(b"  create temporary table t (id int);"),
            StatementType::CreateTable
        );
        assert_eq!(
            classify_line(b"CREATE INDEX idx ON t (a);"),
            StatementType::Unknown
        );
    }

    #[test]
    fn test_ident_display() {
        assert_eq!(Ident::new("users").to_string(), "users");
        assert_eq!(Ident::quoted("users").to_string(), "`users`");
        assert_eq!(Ident::quoted("we`ird").to_string(), "`we``ird`");
    }

    #[test]
    fn test_table_name_display() {
        let table = TableName {
            schema: Some(Ident::quoted("app")),
            name: Ident::quoted("users"),
        };
        assert_eq!(table.to_string(), "`app`.`users`");
    }

    #[test]
    fn test_write_quoted_string() {
        assert_eq!(Literal::string("hello").to_sql(), b"'hello'");
        assert_eq!(Literal::string("it's").to_sql(), b"'it\\'s'");
        assert_eq!(Literal::string("line\nbreak").to_sql(), b"'line\\nbreak'");
        assert_eq!(Literal::string("back\\slash").to_sql(), b"'back\\\\slash'");
        assert_eq!(Literal::string(vec![b'a', 0, b'b']).to_sql(), b"'a\\0b'");
    }

    #[test]
    fn test_literal_sql_forms() {
        assert_eq!(Literal::Null.to_sql(), b"NULL");
        assert_eq!(Literal::Integer("-42".to_string()).to_sql(), b"-42");
        assert_eq!(Literal::Other(b"3.14".to_vec()).to_sql(), b"3.14");
    }

    #[test]
    fn test_is_numeric_literal() {
        assert!(is_numeric_literal("0"));
        assert!(is_numeric_literal("-17"));
        assert!(is_numeric_literal("3.5"));
        assert!(is_numeric_literal(".5"));
        assert!(is_numeric_literal("1e10"));
        assert!(is_numeric_literal("2.5E-3"));

        assert!(!is_numeric_literal(""));
        assert!(!is_numeric_literal("-"));
        assert!(!is_numeric_literal("."));
        assert!(!is_numeric_literal("12a"));
        assert!(!is_numeric_literal("1e"));
        assert!(!is_numeric_literal("$2b$04$abc"));
        assert!(!is_numeric_literal("1 OR 1=1"));
    }
}
