//! Masking engine for INSERT statements in SQL dumps.
//!
//! This module provides:
//! - YAML configuration parsing into per-table, per-column rules
//! - A closed template language (`Raw`, `Salt`, `Hashed`, `First`, `Last`)
//! - The per-run salt and bcrypt hashing
//! - Statement-level masking and reserialization

pub mod config;
pub mod hash;
pub mod rules;
pub mod salt;
pub mod template;
pub mod value;

pub use config::{load_rules, MaskYamlConfig};
pub use hash::{HashCost, DEFAULT_COST, MAX_COST, MIN_COST};
pub use rules::{MaskRule, RuleSet};
pub use salt::Salt;
pub use value::ValueMasker;

use crate::error::{MaskError, Result};
use crate::parser::{InsertStatement, Literal};
use crate::schema::ColumnCatalog;
use std::borrow::Cow;
use std::path::Path;

/// Everything a run masks with, built once before streaming starts
#[derive(Debug)]
pub struct RunContext {
    pub rules: RuleSet,
    pub salt: Salt,
    pub cost: HashCost,
}

impl RunContext {
    pub fn new(rules: RuleSet, salt: Salt, cost: HashCost) -> Self {
        Self { rules, salt, cost }
    }

    /// Load rules from `config`, then draw the run salt.
    pub fn from_config_file(config: &Path, cost: HashCost) -> Result<Self> {
        let rules = load_rules(config)?;
        let salt = Salt::generate()?;
        Ok(Self::new(rules, salt, cost))
    }
}

/// Statistics from a masking run
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct MaskStats {
    /// Input lines read
    pub lines: u64,
    /// INSERT statements parsed
    pub statements: u64,
    /// INSERT statements rewritten because their table has rules
    pub statements_masked: u64,
    /// Values replaced
    pub values_masked: u64,
    /// INSERT lines passed through because they could not be parsed
    pub parse_errors: u64,
    /// CREATE TABLE statements used for column order
    pub tables_cataloged: u64,
    /// Hashes served from the run memo
    pub hash_cache_hits: u64,
}

/// Rewrites parsed INSERT statements according to a [`RunContext`]
pub struct Masker<'a> {
    ctx: &'a RunContext,
    values: ValueMasker,
    stats: MaskStats,
}

impl<'a> Masker<'a> {
    pub fn new(ctx: &'a RunContext) -> Self {
        Self {
            ctx,
            values: ValueMasker::new(),
            stats: MaskStats::default(),
        }
    }

    pub fn context(&self) -> &'a RunContext {
        self.ctx
    }

    /// Mask the rows of `stmt` and return the SQL to emit.
    ///
    /// Tables without rules come back as the original source bytes. Otherwise
    /// every value in a column with a rule is replaced and the statement is
    /// reserialized, terminated by `;`.
    pub fn mask_statement<'s>(
        &mut self,
        stmt: &'s mut InsertStatement,
        catalog: &ColumnCatalog,
    ) -> Result<Cow<'s, [u8]>> {
        self.stats.statements += 1;

        let ctx = self.ctx;
        let Some(table_rules) = ctx.rules.table(stmt.table_name()) else {
            return Ok(Cow::Borrowed(stmt.source.as_slice()));
        };

        let plan: Vec<Option<&MaskRule>> = match stmt.columns {
            Some(ref columns) => columns
                .iter()
                .map(|c| table_rules.get(&c.value))
                .collect(),
            None => {
                let columns = catalog.columns(stmt.table_name()).ok_or_else(|| {
                    MaskError::MissingColumns {
                        table: stmt.table_name().to_string(),
                    }
                })?;
                if let Some(arity) = stmt.arity() {
                    if arity != columns.len() {
                        return Err(MaskError::ColumnMismatch {
                            table: stmt.table_name().to_string(),
                            expected: columns.len(),
                            found: arity,
                        });
                    }
                }
                columns.iter().map(|c| table_rules.get(c)).collect()
            }
        };

        for row in stmt.rows.iter_mut() {
            for (value, rule) in row.iter_mut().zip(&plan) {
                let Some(rule) = rule else {
                    continue;
                };
                if matches!(value, Literal::String(_) | Literal::Integer(_)) {
                    self.stats.values_masked += 1;
                }
                *value = self.values.mask(value, rule, ctx)?;
            }
        }

        self.stats.statements_masked += 1;
        Ok(Cow::Owned(stmt.to_sql()))
    }

    pub fn stats(&self) -> &MaskStats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut MaskStats {
        &mut self.stats
    }

    /// Final statistics, including hash memo hits
    pub fn into_stats(self) -> MaskStats {
        let mut stats = self.stats;
        stats.hash_cache_hits = self.values.cache().hits();
        stats
    }
}
