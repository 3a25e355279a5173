// Per-column value normalization applied before comparison.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::model::{CellValue, Side};

pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

const DATETIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_LAYOUTS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

// Decoded in this order so `&amp;lt;` becomes `&lt;`, not `<`.
const HTML_ENTITIES: &[(&str, &str)] = &[
    ("&#39;", "'"),
    ("&quot;", "\""),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&amp;", "&"),
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NormalizeRule {
    #[serde(flatten)]
    pub op: NormalizeOp,
    #[serde(default)]
    pub side: RuleSide,
}

impl NormalizeRule {
    pub fn new(op: NormalizeOp, side: RuleSide) -> Self {
        Self { op, side }
    }

    pub fn date() -> Self {
        Self::new(
            NormalizeOp::Date {
                format: DEFAULT_DATE_FORMAT.into(),
            },
            RuleSide::Both,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalizeOp {
    /// Coerce to a date string in `format`.
    Date {
        #[serde(default = "default_date_format")]
        format: String,
    },
    /// Decode the common HTML character references in text cells.
    HtmlEntities,
    /// Trim surrounding whitespace in text cells.
    Trim,
    /// Literal substring replacement in text cells.
    Replace { from: String, to: String },
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.into()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSide {
    #[default]
    Both,
    Source,
    Target,
}

impl RuleSide {
    pub fn applies_to(&self, side: Side) -> bool {
        match self {
            RuleSide::Both => true,
            RuleSide::Source => side == Side::Source,
            RuleSide::Target => side == Side::Target,
        }
    }
}

/// Value a date rule could not coerce.
#[derive(Debug, Clone, PartialEq)]
pub struct UnparsedDate(pub String);

impl NormalizeOp {
    pub fn apply(&self, value: CellValue) -> Result<CellValue, UnparsedDate> {
        match self {
            NormalizeOp::Date { format } => coerce_date(value, format),
            NormalizeOp::HtmlEntities => Ok(map_text(value, decode_html_entities)),
            NormalizeOp::Trim => Ok(map_text(value, |s| s.trim().to_string())),
            NormalizeOp::Replace { from, to } => {
                if from.is_empty() {
                    return Ok(value);
                }
                Ok(map_text(value, |s| s.replace(from.as_str(), to)))
            }
        }
    }
}

/// Run every rule that targets `side`, in declaration order.
pub fn apply_rules(
    rules: &[NormalizeRule],
    side: Side,
    value: CellValue,
) -> Result<CellValue, UnparsedDate> {
    rules
        .iter()
        .filter(|rule| rule.side.applies_to(side))
        .try_fold(value, |acc, rule| rule.op.apply(acc))
}

fn map_text(value: CellValue, f: impl FnOnce(&str) -> String) -> CellValue {
    match value {
        CellValue::Text(s) => CellValue::Text(f(&s)),
        other => other,
    }
}

pub fn decode_html_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    HTML_ENTITIES
        .iter()
        .fold(s.to_string(), |acc, (entity, plain)| acc.replace(entity, plain))
}

fn coerce_date(value: CellValue, format: &str) -> Result<CellValue, UnparsedDate> {
    let parsed = match &value {
        CellValue::Empty => return Ok(CellValue::Empty),
        CellValue::Date(dt) => Some(*dt),
        CellValue::Number(serial) => from_serial(*serial),
        CellValue::Text(s) if s.trim().is_empty() => return Ok(CellValue::Empty),
        CellValue::Text(s) => parse_datetime(s.trim()),
        CellValue::Bool(_) => None,
    };

    match parsed {
        Some(dt) => Ok(CellValue::Text(dt.format(format).to_string())),
        None => Err(UnparsedDate(value.to_string())),
    }
}

/// Largest serial a spreadsheet can hold (9999-12-31).
const MAX_SERIAL: f64 = 2_958_466.0;

/// Spreadsheet serial date (1900 system, day 0 = 1899-12-30).
pub fn from_serial(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(0.0..MAX_SERIAL).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(Duration::milliseconds(millis))
}

pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for layout in DATETIME_LAYOUTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, layout) {
            return Some(dt);
        }
    }
    for layout in DATE_LAYOUTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, layout) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date_op() -> NormalizeOp {
        NormalizeOp::Date {
            format: DEFAULT_DATE_FORMAT.into(),
        }
    }

    #[test]
    fn date_from_text_layouts() {
        for input in ["2024-10-11", "2024-10-11 13:45:00", "10/11/2024", "2024-10-11T08:00:00Z"] {
            let out = date_op().apply(CellValue::text(input)).unwrap();
            assert_eq!(out, CellValue::text("2024-10-11"), "input {input}");
        }
    }

    #[test]
    fn date_from_serial_and_date_cell() {
        // 45576 = 2024-10-11
        assert_eq!(
            date_op().apply(CellValue::Number(45576.0)).unwrap(),
            CellValue::text("2024-10-11")
        );

        let dt = NaiveDate::from_ymd_opt(2024, 10, 11)
            .unwrap()
            .and_hms_opt(17, 5, 0)
            .unwrap();
        assert_eq!(date_op().apply(CellValue::Date(dt)).unwrap(), CellValue::text("2024-10-11"));
    }

    #[test]
    fn date_keeps_empty() {
        assert_eq!(date_op().apply(CellValue::Empty).unwrap(), CellValue::Empty);
        assert_eq!(date_op().apply(CellValue::text("  ")).unwrap(), CellValue::Empty);
    }

    #[test]
    fn date_rejects_garbage() {
        let err = date_op().apply(CellValue::text("next tuesday")).unwrap_err();
        assert_eq!(err, UnparsedDate("next tuesday".into()));
        assert!(date_op().apply(CellValue::Bool(true)).is_err());
    }

    #[test]
    fn html_entities_decoded_once() {
        assert_eq!(decode_html_entities("l&#39;avion"), "l'avion");
        assert_eq!(decode_html_entities("a &lt;b&gt; &amp; c"), "a <b> & c");
        assert_eq!(decode_html_entities("&amp;lt;"), "&lt;");
        assert_eq!(decode_html_entities("plain"), "plain");
    }

    #[test]
    fn text_rules_skip_other_kinds() {
        assert_eq!(NormalizeOp::Trim.apply(CellValue::Number(1.0)).unwrap(), CellValue::Number(1.0));
        assert_eq!(NormalizeOp::Trim.apply(CellValue::text("  x ")).unwrap(), CellValue::text("x"));
    }

    #[test]
    fn rules_respect_side() {
        let rules = vec![
            NormalizeRule::new(NormalizeOp::HtmlEntities, RuleSide::Target),
            NormalizeRule::new(NormalizeOp::Trim, RuleSide::Both),
        ];
        let raw = CellValue::text(" d&#39;accord ");
        assert_eq!(
            apply_rules(&rules, Side::Target, raw.clone()).unwrap(),
            CellValue::text("d'accord")
        );
        assert_eq!(
            apply_rules(&rules, Side::Source, raw).unwrap(),
            CellValue::text("d&#39;accord")
        );
    }
}
