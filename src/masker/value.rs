//! Per-value masking.

use super::hash::HashCache;
use super::rules::MaskRule;
use super::template::ValueContext;
use super::RunContext;
use crate::error::{MaskError, Result};
use crate::parser::{is_numeric_literal, Literal};

/// Renders rule templates against literal values.
///
/// Holds the run's hash memo, so one `ValueMasker` must only be used with a
/// single [`RunContext`].
#[derive(Debug, Default)]
pub struct ValueMasker {
    cache: HashCache,
}

impl ValueMasker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replacement for `literal` under `rule`.
    ///
    /// String bytes reach the template exactly as parsed, so `Raw` and
    /// `Hashed` see non-UTF-8 data unaltered.
    ///
    /// `NULL` and non-string, non-integer literals come back unchanged. A
    /// template that renders non-numeric text for an integer literal is an
    /// error rather than invalid SQL.
    pub fn mask(&mut self, literal: &Literal, rule: &MaskRule, ctx: &RunContext) -> Result<Literal> {
        match literal {
            Literal::String(raw) => Ok(Literal::String(self.render(raw, rule, ctx)?)),
            Literal::Integer(raw) => {
                let rendered = self.render(raw.as_bytes(), rule, ctx)?;
                match String::from_utf8(rendered) {
                    Ok(text) if is_numeric_literal(&text) => Ok(Literal::Integer(text)),
                    Ok(text) => Err(MaskError::ValueFormat {
                        table: rule.table.clone(),
                        column: rule.column.clone(),
                        value: text,
                    }),
                    Err(e) => Err(MaskError::ValueFormat {
                        table: rule.table.clone(),
                        column: rule.column.clone(),
                        value: String::from_utf8_lossy(e.as_bytes()).into_owned(),
                    }),
                }
            }
            Literal::Null | Literal::Other(_) => Ok(literal.clone()),
        }
    }

    fn render(&mut self, raw: &[u8], rule: &MaskRule, ctx: &RunContext) -> Result<Vec<u8>> {
        let value_ctx = ValueContext {
            raw,
            salt: &ctx.salt,
            cost: ctx.cost,
        };
        rule.template.render(&value_ctx, &mut self.cache)
    }

    pub fn cache(&self) -> &HashCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::masker::hash::{HashCost, MIN_COST};
    use crate::masker::rules::RuleSet;
    use crate::masker::salt::Salt;
    use std::collections::BTreeMap;

    fn context(column: &str, template: &str) -> RunContext {
        let mut columns = BTreeMap::new();
        columns.insert(column.to_string(), template.to_string());
        let mut mapping = BTreeMap::new();
        mapping.insert("t".to_string(), columns);

        RunContext::new(
            RuleSet::compile(&mapping).unwrap(),
            Salt::from_bytes([5; 16]),
            HashCost::new(MIN_COST).unwrap(),
        )
    }

    fn mask(ctx: &RunContext, literal: Literal) -> Result<Literal> {
        let rule = ctx.rules.get("t", "c").unwrap();
        ValueMasker::new().mask(&literal, rule, ctx)
    }

    #[test]
    fn test_mask_string() {
        let ctx = context("c", "{{ .First 3 }}***");
        assert_eq!(
            mask(&ctx, Literal::string("alice@example.com")).unwrap(),
            Literal::string("ali***")
        );
    }

    #[test]
    fn test_null_is_never_rendered() {
        let ctx = context("c", "MASKED");
        assert_eq!(mask(&ctx, Literal::Null).unwrap(), Literal::Null);
    }

    #[test]
    fn test_other_literals_unchanged() {
        let ctx = context("c", "MASKED");
        let float = Literal::Other(b"3.14".to_vec());
        assert_eq!(mask(&ctx, float.clone()).unwrap(), float);
    }

    #[test]
    fn test_mask_integer() {
        let ctx = context("c", "{{ .Last 2 }}");
        assert_eq!(
            mask(&ctx, Literal::Integer("123456".to_string())).unwrap(),
            Literal::Integer("56".to_string())
        );

        let ctx = context("c", "9{{ .Raw }}");
        assert_eq!(
            mask(&ctx, Literal::Integer("-1".to_string())).unwrap_err().to_string(),
            "template for `t`.`c` rendered non-numeric value \"9-1\" for a numeric column"
        );
    }

    #[test]
    fn test_hashed_integer_is_rejected() {
        let ctx = context("c", "{{ .Hashed }}");
        let err = mask(&ctx, Literal::Integer("42".to_string())).unwrap_err();
        assert!(matches!(err, MaskError::ValueFormat { .. }));
    }

    #[test]
    fn test_hashed_string_verifies() {
        let ctx = context("c", "{{ .Hashed }}");
        let Literal::String(hashed) = mask(&ctx, Literal::string("secret")).unwrap() else {
            panic!("Expected String");
        };
        let hashed = String::from_utf8(hashed).unwrap();
        assert!(bcrypt::verify("secret", &hashed).unwrap());
    }

    #[test]
    fn test_deterministic_within_run() {
        let ctx = context("c", "{{ .Hashed }}");
        let rule = ctx.rules.get("t", "c").unwrap();
        let mut masker = ValueMasker::new();

        let a = masker.mask(&Literal::string("bob"), rule, &ctx).unwrap();
        let b = masker.mask(&Literal::string("bob"), rule, &ctx).unwrap();
        assert_eq!(a, b);
        assert_eq!(masker.cache().hits(), 1);

        // A fresh memo still yields the same hash for the same salt
        let c = ValueMasker::new().mask(&Literal::string("bob"), rule, &ctx).unwrap();
        assert_eq!(a, c);
    }

    #[test]
    fn test_non_utf8_strings_are_not_decoded() {
        let ctx = context("c", "{{ .Hashed }}");
        let rule = ctx.rules.get("t", "c").unwrap();
        let mut masker = ValueMasker::new();

        let Literal::String(ff) = masker.mask(&Literal::String(vec![0xff]), rule, &ctx).unwrap()
        else {
            panic!("Expected String");
        };
        let Literal::String(fe) = masker.mask(&Literal::String(vec![0xfe]), rule, &ctx).unwrap()
        else {
            panic!("Expected String");
        };
        assert_ne!(ff, fe);
        assert!(bcrypt::verify([0xffu8], &String::from_utf8(ff).unwrap()).unwrap());

        let ctx = context("c", "{{ .Raw }}");
        let latin1 = Literal::String(vec![0xff, 0x00, b'a']);
        assert_eq!(mask(&ctx, latin1.clone()).unwrap(), latin1);
    }
}
