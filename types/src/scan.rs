use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Verdict {
    Great,
    Caution,
    Avoid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScanType {
    Ingredients,
    Barcode,
    Image,
}

#[derive(Debug, Clone, PartialEq, Validate, Serialize, Deserialize)]
pub struct ScanByIngredientsRequest {
    #[validate(length(min = 1))]
    pub ingredients_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Validate, Serialize, Deserialize)]
pub struct ScanByBarcodeRequest {
    #[validate(length(min = 1))]
    pub barcode: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryQuery {
    pub limit: u32,
    pub skip: u32,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self { limit: 20, skip: 0 }
    }
}

impl HistoryQuery {
    pub fn next_page(self) -> Self {
        Self {
            skip: self.skip + self.limit,
            ..self
        }
    }

    pub fn previous_page(self) -> Self {
        Self {
            skip: self.skip.saturating_sub(self.limit),
            ..self
        }
    }

    pub fn page(&self) -> u32 {
        self.skip / self.limit.max(1) + 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub scan_id: String,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub scan_type: ScanType,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub product_brand: Option<String>,
    #[serde(default)]
    pub product_category: Option<String>,
    #[serde(default)]
    pub product_id: Option<String>,
    pub ingredients_text: String,
    pub verdict: Verdict,
    pub overall_score: i32,
    pub moisture_score: i32,
    pub buildup_risk: i32,
    pub scalp_score: i32,
    #[serde(default)]
    pub water_based: bool,
    #[serde(default)]
    pub heavy_oils: bool,
    #[serde(default)]
    pub protein_heavy: bool,
    #[serde(default)]
    pub explanation: Vec<String>,
    #[serde(default)]
    pub matched_ingredients_count: u32,
    #[serde(default)]
    pub total_ingredients_count: u32,
    /// Snapshot of the profile the server scored against; kept opaque.
    #[serde(default)]
    pub hair_profile: serde_json::Value,
    #[serde(default, deserialize_with = "crate::time::lenient")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ScanResult {
    pub fn title(&self) -> String {
        match (&self.product_brand, &self.product_name) {
            (Some(brand), Some(name)) => format!("{brand} {name}"),
            (None, Some(name)) => name.clone(),
            (Some(brand), None) => brand.clone(),
            (None, None) => format!("Untitled {} scan", self.scan_type),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String,
    pub name: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    pub category: String,
    pub ingredients_text: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub scan_count: u32,
    #[serde(default, deserialize_with = "crate::time::lenient")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "crate::time::lenient")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Validate, Serialize, Deserialize)]
pub struct ProductCreate {
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[validate(length(min = 1))]
    pub category: String,
    #[validate(length(min = 1))]
    pub ingredients_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub heavy: bool,
    #[serde(default)]
    pub low_porosity_safe: bool,
    #[serde(default)]
    pub high_porosity_safe: bool,
    #[serde(default)]
    pub scalp_safe: bool,
    #[serde(default)]
    pub properties: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ingredients_request_omits_missing_product_fields() {
        let request = ScanByIngredientsRequest {
            ingredients_text: "Water, Glycerin, Shea Butter".to_string(),
            product_name: None,
            product_brand: None,
            product_category: None,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "ingredients_text": "Water, Glycerin, Shea Butter" })
        );
    }

    #[test]
    fn scan_result_parses_server_payload() {
        let scan: ScanResult = serde_json::from_value(json!({
            "scan_id": "9b1c",
            "user_id": "a3853c6f-58d6-4872-a8ac-17257e330603",
            "scan_type": "barcode",
            "product_name": "Curl Cream",
            "product_brand": null,
            "product_category": "leave-in",
            "product_id": null,
            "ingredients_text": "Water, Glycerin",
            "verdict": "CAUTION",
            "overall_score": 61,
            "moisture_score": 70,
            "buildup_risk": 40,
            "scalp_score": 80,
            "water_based": true,
            "heavy_oils": false,
            "protein_heavy": false,
            "explanation": ["Water-based formula"],
            "matched_ingredients_count": 2,
            "total_ingredients_count": 2,
            "hair_profile": { "porosity": "low" },
            "created_at": "2024-05-01T10:00:00.512000"
        }))
        .unwrap();
        assert_eq!(scan.verdict, Verdict::Caution);
        assert_eq!(scan.title(), "Curl Cream");
        assert_eq!(scan.explanation, vec!["Water-based formula".to_string()]);
        assert!(scan.created_at.is_some());
    }

    #[test]
    fn untitled_scans_fall_back_to_scan_type() {
        let scan: ScanResult = serde_json::from_value(json!({
            "scan_id": "9b1c",
            "scan_type": "image",
            "ingredients_text": "Water",
            "verdict": "GREAT",
            "overall_score": 90,
            "moisture_score": 90,
            "buildup_risk": 5,
            "scalp_score": 95
        }))
        .unwrap();
        assert_eq!(scan.title(), "Untitled image scan");
        assert!(scan.created_at.is_none());
    }

    #[test]
    fn history_paging_never_goes_below_zero() {
        let query = HistoryQuery::default();
        assert_eq!(query.previous_page().skip, 0);
        assert_eq!(query.next_page().skip, 20);
        assert_eq!(query.next_page().page(), 2);
    }
}
