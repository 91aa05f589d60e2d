//! Line-oriented driver: reads a dump, masks INSERT lines, writes the rest
//! through unchanged.
//!
//! mysqldump writes one statement per line for data, so every line is
//! classified on its own. `CREATE TABLE` blocks span several lines and are
//! collected until their terminating `;` to feed the [`ColumnCatalog`].

pub mod compression;

pub use compression::Compression;

use crate::error::{MaskError, Result};
use crate::masker::{MaskStats, Masker, RunContext};
use crate::parser::{classify_line, parse_insert, StatementType, MAX_LINE_BYTES, READ_BUFFER_SIZE};
use crate::schema::ColumnCatalog;
use std::io::{BufRead, Read, Write};

/// Upper bound on a buffered CREATE TABLE block
const MAX_DDL_BYTES: usize = 16 * 1024 * 1024;

pub struct StreamDriver<'a, W: Write, D: Write> {
    masker: Masker<'a>,
    catalog: ColumnCatalog,
    output: W,
    diagnostics: D,
    quiet: bool,
    ddl: Option<Vec<u8>>,
    line_no: u64,
    max_line: usize,
}

impl<'a, W: Write, D: Write> StreamDriver<'a, W, D> {
    pub fn new(ctx: &'a RunContext, output: W, diagnostics: D) -> Self {
        Self {
            masker: Masker::new(ctx),
            catalog: ColumnCatalog::new(),
            output,
            diagnostics,
            quiet: false,
            ddl: None,
            line_no: 0,
            max_line: MAX_LINE_BYTES,
        }
    }

    /// Suppress the per-statement ``Masking `table`...`` notices
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn with_max_line_bytes(mut self, max_line: usize) -> Self {
        self.max_line = max_line;
        self
    }

    /// Process every line of `reader`.
    ///
    /// Stops at the first fatal error. Output written before the error has
    /// already been masked.
    pub fn run<R: BufRead>(&mut self, mut reader: R) -> Result<()> {
        let mut line = Vec::with_capacity(READ_BUFFER_SIZE);
        // Room for the line content plus a CRLF terminator
        let limit = self.max_line as u64 + 2;

        loop {
            line.clear();
            let n = reader.by_ref().take(limit).read_until(b'\n', &mut line)?;
            if n == 0 {
                break;
            }
            self.line_no += 1;

            if line.last() == Some(&b'\n') {
                line.pop();
            }
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.len() > self.max_line {
                return Err(MaskError::LineTooLong {
                    line: self.line_no,
                    limit: self.max_line,
                });
            }

            self.process_line(&line)?;
        }

        Ok(())
    }

    /// Process one line without its terminator
    pub fn process_line(&mut self, line: &[u8]) -> Result<()> {
        self.masker.stats_mut().lines += 1;

        match classify_line(line) {
            StatementType::Insert => {
                self.ddl = None;
                return self.process_insert(line);
            }
            StatementType::CreateTable => self.ddl = Some(Vec::new()),
            StatementType::Unknown => {}
        }

        if self.ddl.is_some() {
            self.track_ddl(line);
        }
        self.write_line(line)
    }

    fn process_insert(&mut self, line: &[u8]) -> Result<()> {
        let mut stmt = match parse_insert(line) {
            Ok(stmt) => stmt,
            Err(e) => {
                self.masker.stats_mut().parse_errors += 1;
                writeln!(
                    self.diagnostics,
                    "line {}: {}; passing statement through unchanged",
                    self.line_no, e
                )?;
                return self.write_line(line);
            }
        };

        if !self.quiet {
            writeln!(self.diagnostics, "Masking `{}`...", stmt.table_name())?;
        }

        let masked = self.masker.mask_statement(&mut stmt, &self.catalog)?;
        self.output.write_all(&masked)?;
        self.output.write_all(b"\n")?;
        Ok(())
    }

    fn track_ddl(&mut self, line: &[u8]) {
        let Some(buf) = self.ddl.as_mut() else {
            return;
        };

        if buf.len() + line.len() > MAX_DDL_BYTES {
            self.ddl = None;
            return;
        }
        buf.extend_from_slice(line);
        buf.push(b'\n');

        let last = line.iter().rev().find(|b| !b.is_ascii_whitespace());
        if last != Some(&b';') {
            return;
        }

        if let Some(block) = self.ddl.take() {
            let stmt = String::from_utf8_lossy(&block);
            if self.catalog.record_create_table(&stmt).is_some() {
                self.masker.stats_mut().tables_cataloged += 1;
            }
        }
    }

    fn write_line(&mut self, line: &[u8]) -> Result<()> {
        self.output.write_all(line)?;
        self.output.write_all(b"\n")?;
        Ok(())
    }

    pub fn catalog(&self) -> &ColumnCatalog {
        &self.catalog
    }

    pub fn stats(&self) -> &MaskStats {
        self.masker.stats()
    }

    pub fn line_number(&self) -> u64 {
        self.line_no
    }

    /// Flush output and return the run statistics
    pub fn finish(mut self) -> Result<MaskStats> {
        self.output.flush()?;
        self.diagnostics.flush()?;
        Ok(self.masker.into_stats())
    }
}

/// Mask a whole dump from `reader` into `output`.
pub fn mask_stream<R: BufRead, W: Write, D: Write>(
    ctx: &RunContext,
    reader: R,
    output: W,
    diagnostics: D,
    quiet: bool,
) -> Result<MaskStats> {
    let mut driver = StreamDriver::new(ctx, output, diagnostics).quiet(quiet);
    driver.run(reader)?;
    driver.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::masker::{HashCost, RuleSet, Salt, MIN_COST};
    use std::collections::BTreeMap;

    fn context(entries: &[(&str, &str, &str)]) -> RunContext {
        let mut mapping: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        for (table, column, template) in entries {
            mapping
                .entry(table.to_string())
                .or_default()
                .insert(column.to_string(), template.to_string());
        }
        RunContext::new(
            RuleSet::compile(&mapping).unwrap(),
            Salt::from_bytes([3; 16]),
            HashCost::new(MIN_COST).unwrap(),
        )
    }

    fn run(ctx: &RunContext, input: &str) -> (Result<MaskStats>, String, String) {
        let mut out = Vec::new();
        let mut diag = Vec::new();
        let result = mask_stream(ctx, input.as_bytes(), &mut out, &mut diag, false);
        (
            result,
            String::from_utf8(out).unwrap(),
            String::from_utf8(diag).unwrap(),
        )
    }

    #[test]
    fn test_masks_and_passes_through() {
        let ctx = context(&[("users", "email", "{{ .First 3 }}***")]);
        let input = "-- comment\n\
                     INSERT INTO users (id, email) VALUES (1, 'alice@example.com');\n\
                     INSERT INTO unconfigured_table (x) VALUES (1);\n";
        let (result, out, diag) = run(&ctx, input);
        let stats = result.unwrap();

        assert_eq!(
            out,
            "-- comment\n\
             INSERT INTO users (id, email) VALUES (1, 'ali***');\n\
             INSERT INTO unconfigured_table (x) VALUES (1);\n"
        );
        assert_eq!(diag, "Masking `users`...\nMasking `unconfigured_table`...\n");
        assert_eq!(stats.lines, 3);
        assert_eq!(stats.statements, 2);
        assert_eq!(stats.statements_masked, 1);
    }

    #[test]
    fn test_quiet_suppresses_notices() {
        let ctx = context(&[]);
        let mut out = Vec::new();
        let mut diag = Vec::new();
        mask_stream(&ctx, &b"INSERT INTO t (a) VALUES (1);\n"[..], &mut out, &mut diag, true)
            .unwrap();
        assert!(diag.is_empty());
        assert_eq!(out, b"INSERT INTO t (a) VALUES (1);\n");
    }

    #[test]
    fn test_parse_error_passes_line_through() {
        let ctx = context(&[("users", "email", "x")]);
        let input = "INSERT INTO users (id, email) VALUES (1, 'unterminated);\nSELECT 1;\n";
        let (result, out, diag) = run(&ctx, input);

        assert_eq!(result.unwrap().parse_errors, 1);
        assert_eq!(out, input);
        assert!(diag.starts_with("line 1: sql parser error"));
    }

    #[test]
    fn test_crlf_and_missing_final_newline() {
        let ctx = context(&[]);
        let (_, out, _) = run(&ctx, "SET NAMES utf8mb4;\r\n-- end");
        assert_eq!(out, "SET NAMES utf8mb4;\n-- end\n");
    }

    #[test]
    fn test_indented_insert_is_not_masked() {
        let ctx = context(&[("users", "email", "x")]);
        let input = "  INSERT INTO users (email) VALUES ('a');\n";
        let (result, out, diag) = run(&ctx, input);
        assert_eq!(result.unwrap().statements, 0);
        assert_eq!(out, input);
        assert!(diag.is_empty());
    }

    #[test]
    fn test_create_table_feeds_catalog() {
        let ctx = context(&[("users", "email", "{{ .Last 3 }}")]);
        let input = "CREATE TABLE `users` (\n  \
                     `id` int NOT NULL,\n  \
                     `email` varchar(255) DEFAULT NULL,\n  \
                     PRIMARY KEY (`id`)\n\
                     ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;\n\
                     INSERT INTO `users` VALUES (1,'a@b.org'),(2,NULL);\n";
        let (result, out, _) = run(&ctx, input);

        let stats = result.unwrap();
        assert_eq!(stats.tables_cataloged, 1);
        assert!(out.starts_with("CREATE TABLE `users` (\n  `id` int NOT NULL,\n"));
        assert!(out.ends_with("INSERT INTO `users` VALUES (1, 'org'), (2, NULL);\n"));
    }

    #[test]
    fn test_column_less_insert_without_schema_is_fatal() {
        let ctx = context(&[("users", "email", "x")]);
        let input = "SELECT 1;\nINSERT INTO users VALUES (1,'a@b.org');\nSELECT 2;\n";
        let (result, out, _) = run(&ctx, input);

        assert!(matches!(result, Err(MaskError::MissingColumns { .. })));
        assert!(!out.contains("a@b.org"));
        assert!(!out.contains("SELECT 2"));
    }

    #[test]
    fn test_line_too_long() {
        let ctx = context(&[]);
        let mut out = Vec::new();
        let mut driver = StreamDriver::new(&ctx, &mut out, std::io::sink()).with_max_line_bytes(8);

        let err = driver.run(&b"short\n12345678\n123456789\n"[..]).unwrap_err();
        assert!(matches!(err, MaskError::LineTooLong { line: 3, limit: 8 }));
        assert_eq!(driver.line_number(), 3);
        drop(driver);
        assert_eq!(out, b"short\n12345678\n");
    }

    #[test]
    fn test_crlf_line_at_exact_limit() {
        let ctx = context(&[]);
        let mut out = Vec::new();
        let mut driver = StreamDriver::new(&ctx, &mut out, std::io::sink()).with_max_line_bytes(8);

        driver.run(&b"12345678\r\n1234567\r\n12345678"[..]).unwrap();
        let err = driver.run(&b"123456789\r\n"[..]).unwrap_err();
        assert!(matches!(err, MaskError::LineTooLong { line: 4, limit: 8 }));
        drop(driver);
        assert_eq!(out, b"12345678\n1234567\n12345678\n");
    }

    #[test]
    fn test_hashed_output_deterministic_within_run() {
        let ctx = context(&[("users", "password", "{{ .Hashed }}")]);
        let input = "INSERT INTO users (password) VALUES ('hunter2');\n\
                     INSERT INTO users (password) VALUES ('hunter2');\n";
        let (result, out, _) = run(&ctx, input);

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], lines[1]);
        assert_eq!(result.unwrap().hash_cache_hits, 1);

        let hashed = lines[0]
            .trim_start_matches("INSERT INTO users (password) VALUES ('")
            .trim_end_matches("');");
        assert!(bcrypt::verify("hunter2", hashed).unwrap());
    }
}
