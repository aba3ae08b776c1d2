//! Inference of the subdivision code and name fields of a source layer.
//!
//! Rules are data: an ordered list of [`FieldMatcher`]s per target attribute.
//! Matchers are tried in order and, for each matcher, fields in layer order;
//! the first hit wins.

use anyhow::{Context, Result};
use regex::Regex;

use crate::error::SchemaMappingError;

/// Default exact field names, most preferred first.
const PCODE_EXACT: &[&str] = &["ADM1_PCODE"];
const NAME_EXACT:  &[&str] = &["ADM1_EN", "ADM1_REF"];

/// Regex fallbacks tried after exact names and configured aliases.
const PCODE_PATTERN: &str = r"(?i)^adm1_?p?code$";
const NAME_PATTERN:  &str = r"(?i)adm1";
const NAME_EXCLUDE:  &str = r"(?i)alt|pcode|ref";

/// One way of recognizing a field name.
#[derive(Debug, Clone)]
pub enum FieldMatcher {
    /// Case-sensitive exact name.
    Exact(String),
    /// Any of the names, ignoring ASCII case.
    Alias(Vec<String>),
    /// Names matching `include` and not matching `exclude`.
    Pattern { include: Regex, exclude: Option<Regex> },
}

impl FieldMatcher {
    pub fn matches(&self, field: &str) -> bool {
        match self {
            FieldMatcher::Exact(name) => field == name,
            FieldMatcher::Alias(names) => names.iter().any(|n| n.eq_ignore_ascii_case(field)),
            FieldMatcher::Pattern { include, exclude } => {
                include.is_match(field) && !exclude.as_ref().is_some_and(|re| re.is_match(field))
            }
        }
    }
}

/// Ordered matchers for the code and the name field.
#[derive(Debug, Clone)]
pub struct FieldRules {
    pub pcode: Vec<FieldMatcher>,
    pub name:  Vec<FieldMatcher>,
}

impl FieldRules {
    /// Default rules with configured aliases slotted between exact names and patterns.
    pub fn new(pcode_aliases: &[String], name_aliases: &[String]) -> Result<Self> {
        let mut pcode: Vec<FieldMatcher> = PCODE_EXACT.iter().map(|s| FieldMatcher::Exact(s.to_string())).collect();
        if !pcode_aliases.is_empty() {
            pcode.push(FieldMatcher::Alias(pcode_aliases.to_vec()));
        }
        pcode.push(FieldMatcher::Pattern {
            include: Regex::new(PCODE_PATTERN).context("[schema] invalid pcode pattern")?,
            exclude: None,
        });

        let mut name: Vec<FieldMatcher> = NAME_EXACT.iter().map(|s| FieldMatcher::Exact(s.to_string())).collect();
        if !name_aliases.is_empty() {
            name.push(FieldMatcher::Alias(name_aliases.to_vec()));
        }
        name.push(FieldMatcher::Pattern {
            include: Regex::new(NAME_PATTERN).context("[schema] invalid name pattern")?,
            exclude: Some(Regex::new(NAME_EXCLUDE).context("[schema] invalid name exclusion pattern")?),
        });

        Ok(Self { pcode, name })
    }
}

/// Which source fields feed the subdivision code and name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    /// Absent when codes have to be synthesized.
    pub pcode: Option<String>,
    pub name:  String,
}

/// First field satisfying the earliest matcher.
fn first_match(fields: &[String], matchers: &[FieldMatcher]) -> Option<String> {
    matchers.iter()
        .find_map(|m| fields.iter().find(|f| m.matches(f)))
        .cloned()
}

/// Map a layer's fields onto the code and name attributes.
pub fn map_fields(fields: &[String], rules: &FieldRules) -> Result<FieldMapping, SchemaMappingError> {
    let name = first_match(fields, &rules.name)
        .ok_or_else(|| SchemaMappingError { fields: fields.to_vec() })?;
    let pcode = first_match(fields, &rules.pcode);
    Ok(FieldMapping { pcode, name })
}
