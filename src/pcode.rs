//! Canonical subdivision codes (`pcodes`).
//!
//! A canonical pcode is text. Numeric identifiers become `{iso2}{index}` with
//! the index zero-padded to `max(2, digits(rows))`; text identifiers are kept
//! as published (trimmed). Missing identifiers are synthesized from row order.

use ahash::{AHashMap, AHashSet};
use serde::Deserialize;

use crate::error::PcodeCollision;
use crate::types::AttrValue;

/// How numeric values in a code-like field (`*PCOD*`, `*CODE*`) are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericPcodeRule {
    /// `{iso2}{zero-padded value}`, the same as for non-code fields.
    #[default]
    PadWithPrefix,
    /// Integer text with no prefix, e.g. `3.0` becomes `"3"`.
    CastToInteger,
}

/// Result of normalizing one country's codes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pcodes {
    /// One code per source row, in row order.
    pub codes:       Vec<String>,
    /// Rows whose code was synthesized from the row index.
    pub synthesized: Vec<usize>,
    pub collisions:  Vec<PcodeCollision>,
}

/// True for field names that look like they already carry an identifier.
pub fn is_code_like(field: &str) -> bool {
    let upper = field.to_ascii_uppercase();
    upper.contains("PCOD") || upper.contains("CODE")
}

/// Zero-pad width for a layer of `rows` features.
#[inline]
fn pad_width(rows: usize) -> usize {
    rows.to_string().len().max(2)
}

#[derive(Debug, Clone)]
pub struct PcodeNormalizer {
    prefix: String,
    rule:   NumericPcodeRule,
}

impl PcodeNormalizer {
    pub fn new(iso2: &str, rule: NumericPcodeRule) -> Self {
        Self { prefix: iso2.to_string(), rule }
    }

    fn padded(&self, index: i64, width: usize) -> String {
        format!("{}{:0width$}", self.prefix, index, width = width)
    }

    /// Sequential `{iso2}01, {iso2}02, ...` codes in row order.
    pub fn sequential(&self, rows: usize) -> Pcodes {
        let width = pad_width(rows);
        let codes = (1..=rows).map(|i| self.padded(i as i64, width)).collect();
        Pcodes { codes, synthesized: (0..rows).collect(), collisions: Vec::new() }
    }

    /// Normalize the values of the field `field`.
    pub fn from_column(&self, field: &str, values: &[AttrValue]) -> Pcodes {
        let rows = values.len();
        let width = pad_width(rows);
        let numeric = values.iter().any(AttrValue::is_number)
            && values.iter().all(|v| v.is_number() || v.is_null());
        let rule = if numeric && is_code_like(field) { self.rule } else { NumericPcodeRule::PadWithPrefix };

        let published: Vec<Option<String>> = values.iter()
            .map(|value| match value {
                AttrValue::Number(n) if numeric => match rule {
                    NumericPcodeRule::PadWithPrefix => Some(self.padded(n.trunc() as i64, width)),
                    NumericPcodeRule::CastToInteger => Some(format!("{}", n.trunc() as i64)),
                },
                other => other.to_text(),
            })
            .collect();

        // Fallback codes start at the row's position and skip any code already taken.
        let mut taken: AHashSet<String> = published.iter().flatten().cloned().collect();
        let mut synthesized = Vec::new();
        let codes = published.into_iter().enumerate()
            .map(|(row, code)| code.unwrap_or_else(|| {
                synthesized.push(row);
                let mut index = row as i64 + 1;
                while taken.contains(&self.padded(index, width)) {
                    index += 1;
                }
                let code = self.padded(index, width);
                taken.insert(code.clone());
                code
            }))
            .collect::<Vec<String>>();

        let collisions = find_collisions(&codes);
        Pcodes { codes, synthesized, collisions }
    }
}

/// Every code used by more than one row, ordered by first occurrence.
fn find_collisions(codes: &[String]) -> Vec<PcodeCollision> {
    let mut rows: AHashMap<&str, Vec<usize>> = AHashMap::new();
    for (row, code) in codes.iter().enumerate() {
        rows.entry(code.as_str()).or_default().push(row);
    }
    let mut collisions: Vec<PcodeCollision> = rows.into_iter()
        .filter(|(_, rows)| rows.len() > 1)
        .map(|(pcode, rows)| PcodeCollision { pcode: pcode.to_string(), rows })
        .collect();
    collisions.sort_by_key(|c| c.rows[0]);
    collisions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nums(values: &[f64]) -> Vec<AttrValue> {
        values.iter().map(|&v| AttrValue::Number(v)).collect()
    }

    #[test]
    fn sequential_codes_for_three_rows() {
        let p = PcodeNormalizer::new("ZZ", NumericPcodeRule::default()).sequential(3);
        assert_eq!(p.codes, vec!["ZZ01", "ZZ02", "ZZ03"]);
        assert_eq!(p.synthesized, vec![0, 1, 2]);
        assert!(p.collisions.is_empty());
    }

    #[test]
    fn pad_width_grows_with_row_count() {
        let p = PcodeNormalizer::new("ZZ", NumericPcodeRule::default()).sequential(120);
        assert_eq!(p.codes[0], "ZZ001");
        assert_eq!(p.codes[119], "ZZ120");
    }

    #[test]
    fn numeric_ids_in_plain_field_get_prefix() {
        let p = PcodeNormalizer::new("SD", NumericPcodeRule::CastToInteger)
            .from_column("OBJECTID", &nums(&[1.0, 2.0, 10.0]));
        assert_eq!(p.codes, vec!["SD01", "SD02", "SD10"]);
    }

    #[test]
    fn numeric_code_field_follows_rule() {
        let values = nums(&[3.0, 12.0]);
        let padded = PcodeNormalizer::new("SD", NumericPcodeRule::PadWithPrefix).from_column("ADM1_CODE", &values);
        assert_eq!(padded.codes, vec!["SD03", "SD12"]);
        let cast = PcodeNormalizer::new("SD", NumericPcodeRule::CastToInteger).from_column("ADM1_CODE", &values);
        assert_eq!(cast.codes, vec!["3", "12"]);
    }

    #[test]
    fn text_codes_are_trimmed_and_nulls_synthesized() {
        let values = vec![AttrValue::from(" AF01 "), AttrValue::Null, AttrValue::from("AF03")];
        let p = PcodeNormalizer::new("AF", NumericPcodeRule::default()).from_column("ADM1_PCODE", &values);
        assert_eq!(p.codes, vec!["AF01", "AF02", "AF03"]);
        assert_eq!(p.synthesized, vec![1]);
    }

    #[test]
    fn synthesized_codes_skip_published_ones() {
        let values = vec![AttrValue::from("ZZ02"), AttrValue::Null, AttrValue::from("ZZ03"), AttrValue::Null];
        let p = PcodeNormalizer::new("ZZ", NumericPcodeRule::default()).from_column("ADM1_PCODE", &values);
        assert_eq!(p.codes, vec!["ZZ02", "ZZ04", "ZZ03", "ZZ05"]);
        assert_eq!(p.synthesized, vec![1, 3]);
        assert!(p.collisions.is_empty());
    }

    #[test]
    fn duplicate_codes_are_reported_not_fatal() {
        let values = vec![AttrValue::from("X1"), AttrValue::from("X2"), AttrValue::from("X1")];
        let p = PcodeNormalizer::new("XX", NumericPcodeRule::default()).from_column("PCODE", &values);
        assert_eq!(p.codes.len(), 3);
        assert_eq!(p.collisions, vec![PcodeCollision { pcode: "X1".into(), rows: vec![0, 2] }]);
    }

    #[test]
    fn code_like_detection_is_case_insensitive() {
        assert!(is_code_like("adm1_pcod"));
        assert!(is_code_like("ProvCode"));
        assert!(!is_code_like("OBJECTID"));
    }
}
