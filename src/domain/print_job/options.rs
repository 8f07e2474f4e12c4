use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::catalog::{CatalogKey, ColorMode, PaperQuality, PaperSize, PrintSide};

// ============================================================================
// Print Options
// ============================================================================
//
// Typed replacement for the free-form options blob stored on a print job.
// New jobs are always written in the canonical JSON form produced by
// `to_json`. Stored blobs are read with `parse_lenient`, which tolerates
// legacy key spellings and yields `None` for anything it cannot understand.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BindingSpec {
    #[serde(rename = "type")]
    pub binding_type: String,
}

impl BindingSpec {
    pub fn new(binding_type: impl Into<String>) -> Self {
        Self {
            binding_type: binding_type.into().trim().to_ascii_uppercase(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintOptions {
    pub color: ColorMode,
    pub paper_size: PaperSize,
    pub paper_quality: PaperQuality,
    pub side: PrintSide,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<BindingSpec>,
}

impl PrintOptions {
    pub fn catalog_key(&self) -> CatalogKey {
        CatalogKey::new(self.color, self.paper_size, self.paper_quality, self.side)
    }

    pub fn binding_type(&self) -> Option<&str> {
        self.binding.as_ref().map(|b| b.binding_type.as_str())
    }

    /// Canonical stored form
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Read a stored options blob. Missing, malformed, or unrecognised blobs
    /// produce `None` instead of an error.
    pub fn parse_lenient(raw: Option<&str>) -> Option<Self> {
        let raw = raw?.trim();
        if raw.is_empty() {
            return None;
        }

        let value: Value = serde_json::from_str(raw).ok()?;
        let obj = value.as_object()?;

        Some(Self {
            color: text_field(obj, &["color", "colour", "colorMode"])?.parse().ok()?,
            paper_size: text_field(obj, &["paperSize", "paper_size", "size"])?.parse().ok()?,
            paper_quality: text_field(obj, &["paperQuality", "paper_quality", "quality"])?
                .parse()
                .ok()?,
            side: text_field(obj, &["side", "sides", "printOption", "print_option"])?
                .parse()
                .ok()?,
            binding: binding_field(obj),
        })
    }
}

fn text_field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a str> {
    names.iter().find_map(|name| obj.get(*name)).and_then(Value::as_str)
}

fn binding_field(obj: &Map<String, Value>) -> Option<BindingSpec> {
    let raw = match obj.get("binding").or_else(|| obj.get("bindingType"))? {
        Value::String(s) => s.as_str(),
        Value::Object(inner) => text_field(inner, &["type", "bindingType"])?,
        _ => return None,
    };

    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("NONE") {
        return None;
    }
    Some(BindingSpec::new(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PrintOptions {
        PrintOptions {
            color: ColorMode::Color,
            paper_size: PaperSize::A4,
            paper_quality: PaperQuality::Gsm80,
            side: PrintSide::Single,
            binding: Some(BindingSpec::new("spiral")),
        }
    }

    #[test]
    fn test_canonical_json_shape() {
        let json = sample().to_json().unwrap();
        assert_eq!(
            json,
            r#"{"color":"COLOR","paperSize":"A4","paperQuality":"80GSM","side":"SINGLE","binding":{"type":"SPIRAL"}}"#
        );
    }

    #[test]
    fn test_lenient_parse_reads_canonical_form() {
        let json = sample().to_json().unwrap();
        assert_eq!(PrintOptions::parse_lenient(Some(&json)), Some(sample()));
    }

    #[test]
    fn test_lenient_parse_accepts_legacy_keys() {
        let legacy = r#"{"colour":"color","paper_size":"a4","quality":"80","printOption":"single","binding":"Spiral"}"#;
        assert_eq!(PrintOptions::parse_lenient(Some(legacy)), Some(sample()));
    }

    #[test]
    fn test_lenient_parse_treats_none_binding_as_absent() {
        let raw = r#"{"color":"BW","paperSize":"A3","paperQuality":"70GSM","side":"DOUBLE","binding":"NONE"}"#;
        let parsed = PrintOptions::parse_lenient(Some(raw)).unwrap();
        assert_eq!(parsed.binding, None);
        assert_eq!(parsed.binding_type(), None);
    }

    #[test]
    fn test_lenient_parse_rejects_garbage() {
        assert_eq!(PrintOptions::parse_lenient(None), None);
        assert_eq!(PrintOptions::parse_lenient(Some("")), None);
        assert_eq!(PrintOptions::parse_lenient(Some("{not json")), None);
        assert_eq!(PrintOptions::parse_lenient(Some("[1,2]")), None);
        assert_eq!(
            PrintOptions::parse_lenient(Some(r#"{"color":"COLOR","paperSize":"B5","paperQuality":"80GSM","side":"SINGLE"}"#)),
            None
        );
    }

    #[test]
    fn test_key_order_does_not_matter() {
        let a = r#"{"side":"SINGLE","color":"COLOR","paperQuality":"80GSM","paperSize":"A4"}"#;
        let b = r#"{"color":"COLOR","paperSize":"A4","paperQuality":"80GSM","side":"SINGLE"}"#;
        assert_eq!(PrintOptions::parse_lenient(Some(a)), PrintOptions::parse_lenient(Some(b)));
    }
}
