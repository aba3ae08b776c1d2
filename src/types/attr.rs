use std::fmt;

/// A single attribute value read from a source layer.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(String),
    Number(f64),
    Null,
}

impl AttrValue {
    #[inline] pub fn is_null(&self) -> bool { matches!(self, AttrValue::Null) }

    #[inline] pub fn is_number(&self) -> bool { matches!(self, AttrValue::Number(_)) }

    /// Text form of the value: trimmed text, integral numbers without a
    /// fractional part, `None` for null or blank values.
    pub fn to_text(&self) -> Option<String> {
        match self {
            AttrValue::Text(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            AttrValue::Number(n) if n.is_finite() && n.fract() == 0.0 => Some(format!("{}", *n as i64)),
            AttrValue::Number(n) => Some(n.to_string()),
            AttrValue::Null => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_text() {
            Some(text) => f.write_str(&text),
            None => f.write_str("<null>"),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self { AttrValue::Text(s.to_string()) }
}

impl From<f64> for AttrValue {
    fn from(n: f64) -> Self { AttrValue::Number(n) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_trimmed_and_blank_is_none() {
        assert_eq!(AttrValue::from("  AF01 ").to_text().as_deref(), Some("AF01"));
        assert_eq!(AttrValue::from("   ").to_text(), None);
        assert_eq!(AttrValue::Null.to_text(), None);
    }

    #[test]
    fn integral_numbers_drop_fraction() {
        assert_eq!(AttrValue::from(7.0).to_text().as_deref(), Some("7"));
        assert_eq!(AttrValue::from(7.5).to_text().as_deref(), Some("7.5"));
    }
}
