//! Compiled masking rules.

use super::template::CompiledTemplate;
use crate::error::{MaskError, Result};
use ahash::AHashMap;
use std::collections::BTreeMap;

/// How to mask one column of one table
#[derive(Debug, Clone)]
pub struct MaskRule {
    pub table: String,
    pub column: String,
    pub template: CompiledTemplate,
}

/// Rules of a single table, keyed by column name
pub type TableRules = AHashMap<String, MaskRule>;

/// All rules of a run: table -> column -> rule.
///
/// Built once at startup and read-only afterwards. Lookups are exact, the
/// way names appear in the dump.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    tables: AHashMap<String, TableRules>,
}

impl RuleSet {
    /// Compile every `table -> column -> template` entry.
    ///
    /// Any invalid template fails the whole set: a partially usable rule set
    /// would silently leave columns unmasked.
    pub fn compile(mapping: &BTreeMap<String, BTreeMap<String, String>>) -> Result<Self> {
        let mut tables = AHashMap::with_capacity(mapping.len());

        for (table, columns) in mapping {
            let mut rules = TableRules::with_capacity(columns.len());
            for (column, source) in columns {
                let template =
                    CompiledTemplate::compile(source).map_err(|message| MaskError::Template {
                        table: table.clone(),
                        column: column.clone(),
                        message,
                    })?;
                rules.insert(
                    column.clone(),
                    MaskRule {
                        table: table.clone(),
                        column: column.clone(),
                        template,
                    },
                );
            }
            tables.insert(table.clone(), rules);
        }

        Ok(Self { tables })
    }

    pub fn table(&self, table: &str) -> Option<&TableRules> {
        self.tables.get(table)
    }

    pub fn get(&self, table: &str, column: &str) -> Option<&MaskRule> {
        self.tables.get(table)?.get(column)
    }

    /// Number of configured tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Total number of column rules
    pub fn rule_count(&self) -> usize {
        self.tables.values().map(|t| t.len()).sum()
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}
