use crate::config::NormalizerOptions;
use crate::tokenizer::normalize_opt;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Catalog keyed by pid.
pub type Corpus = HashMap<String, RawDocument>;

/// A catalog record as delivered by the corpus loader.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDocument {
    pub pid: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub sub_category: Option<String>,
    #[serde(default)]
    pub seller: Option<String>,
    /// Attribute map; values are arbitrary JSON and turned into text before normalization.
    #[serde(default)]
    pub product_details: BTreeMap<String, Value>,
    #[serde(default)]
    pub out_of_stock: bool,
    #[serde(default, deserialize_with = "lenient_number")]
    pub selling_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub actual_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub discount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub url: String,
}

/// Coerce a loosely typed numeric field: numbers pass through, strings such as
/// `"₹1,499"` or `"55% off"` keep only digits and dots before parsing. Anything
/// that does not parse to a finite float is absent.
pub fn parse_numeric(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let digits: String = s.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
            digits.parse::<f64>().ok()
        }
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(parse_numeric(&value))
}

/// Attribute values as text. Falsy values (null, empty string, zero, false,
/// empty array or object) carry no text.
fn attribute_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(s) if s.is_empty() => None,
        Value::Array(a) if a.is_empty() => None,
        Value::Object(o) if o.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// A catalog record together with the normalized tokens of each textual field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedDocument {
    pub raw: RawDocument,
    pub title_terms: Vec<String>,
    pub description_terms: Vec<String>,
    pub brand_terms: Vec<String>,
    pub category_terms: Vec<String>,
    pub sub_category_terms: Vec<String>,
    pub seller_terms: Vec<String>,
    pub attribute_terms: BTreeMap<String, Vec<String>>,
    /// Title, description, brand, category, sub-category, seller, then attribute values.
    pub search_text: Vec<String>,
}

impl ProcessedDocument {
    pub fn from_raw(raw: RawDocument, options: NormalizerOptions) -> Self {
        let title_terms = normalize_opt(Some(&raw.title), options);
        let description_terms = normalize_opt(raw.description.as_deref(), options);
        let brand_terms = normalize_opt(raw.brand.as_deref(), options);
        let category_terms = normalize_opt(raw.category.as_deref(), options);
        let sub_category_terms = normalize_opt(raw.sub_category.as_deref(), options);
        let seller_terms = normalize_opt(raw.seller.as_deref(), options);

        let attribute_terms: BTreeMap<String, Vec<String>> = raw
            .product_details
            .iter()
            .filter(|(key, _)| !key.is_empty())
            .filter_map(|(key, value)| {
                attribute_text(value).map(|text| (key.clone(), normalize_opt(Some(&text), options)))
            })
            .collect();

        let mut search_text = Vec::new();
        for field in [
            &title_terms,
            &description_terms,
            &brand_terms,
            &category_terms,
            &sub_category_terms,
            &seller_terms,
        ] {
            search_text.extend(field.iter().cloned());
        }
        for terms in attribute_terms.values() {
            search_text.extend(terms.iter().cloned());
        }

        Self {
            raw,
            title_terms,
            description_terms,
            brand_terms,
            category_terms,
            sub_category_terms,
            seller_terms,
            attribute_terms,
            search_text,
        }
    }

    pub fn pid(&self) -> &str { &self.raw.pid }
    pub fn title(&self) -> &str { &self.raw.title }
}

/// Process a batch of records in order.
pub fn process_all<I>(docs: I, options: NormalizerOptions) -> Vec<ProcessedDocument>
where
    I: IntoIterator<Item = RawDocument>,
{
    docs.into_iter().map(|raw| ProcessedDocument::from_raw(raw, options)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_fields_degrade_to_absent() {
        assert_eq!(parse_numeric(&json!(4.2)), Some(4.2));
        assert_eq!(parse_numeric(&json!("1,499")), Some(1499.0));
        assert_eq!(parse_numeric(&json!("55% off")), Some(55.0));
        assert_eq!(parse_numeric(&json!("n/a")), None);
        assert_eq!(parse_numeric(&json!("1.2.3")), None);
        assert_eq!(parse_numeric(&json!(null)), None);
        assert_eq!(parse_numeric(&json!([1])), None);
    }

    #[test]
    fn deserializes_loose_records() {
        let doc: RawDocument = serde_json::from_value(json!({
            "pid": "TKP1",
            "title": "Solid Track Pants",
            "selling_price": "₹ 499",
            "discount": "40% off",
            "average_rating": "",
            "product_details": {"Fabric": "Cotton Blend", "Pockets": 2}
        }))
        .unwrap();
        assert_eq!(doc.selling_price, Some(499.0));
        assert_eq!(doc.discount, Some(40.0));
        assert_eq!(doc.average_rating, None);
        assert_eq!(doc.actual_price, None);
        assert!(!doc.out_of_stock);
    }

    #[test]
    fn search_text_follows_field_order() {
        let mut details = BTreeMap::new();
        details.insert("Fabric".to_string(), json!("Silk"));
        details.insert("Pockets".to_string(), json!(2));
        details.insert("Style".to_string(), Value::Null);
        details.insert("Lining".to_string(), json!(false));
        details.insert("Rating".to_string(), json!(0));
        details.insert("Sizes".to_string(), json!([]));
        details.insert("Trim".to_string(), json!({}));
        let raw = RawDocument {
            pid: "p1".into(),
            title: "Red Shirt".into(),
            description: Some("Comfortable".into()),
            brand: Some("Arbo".into()),
            category: Some("Clothing".into()),
            seller: Some("Retail".into()),
            product_details: details,
            ..Default::default()
        };
        let doc = ProcessedDocument::from_raw(raw, NormalizerOptions::default());
        assert_eq!(doc.title_terms, vec!["red", "shirt"]);
        assert_eq!(&doc.search_text[..2], &["red".to_string(), "shirt".to_string()]);
        assert_eq!(doc.search_text.last().map(String::as_str), Some("2"));
        for falsy in ["Style", "Lining", "Rating", "Sizes", "Trim"] {
            assert!(!doc.attribute_terms.contains_key(falsy), "{falsy} should carry no text");
        }
        assert_eq!(
            doc.search_text.len(),
            doc.title_terms.len()
                + doc.description_terms.len()
                + doc.brand_terms.len()
                + doc.category_terms.len()
                + doc.sub_category_terms.len()
                + doc.seller_terms.len()
                + 2
        );
    }
}
