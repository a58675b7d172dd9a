use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub prices: BTreeMap<String, i64>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default = "default_active")]
    pub active: bool,
    pub category_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub images: Option<Vec<String>>,
    pub prices: Option<BTreeMap<String, i64>>,
    pub stock: Option<i32>,
    pub active: Option<bool>,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    pub name: String,
    pub slug: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub sort_order: i32,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub active: Option<bool>,
    pub sort_order: Option<i32>,
    /// Absent leaves the image untouched; an explicit null clears it.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub image_url: Option<Option<String>>,
}

fn default_active() -> bool {
    true
}

// Distinguishes a key set to null from a key that is absent.
fn double_option<'de, D>(de: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_update_distinguishes_null_from_absent() {
        let absent: UpdateCategoryRequest = serde_json::from_str("{}").expect("valid json");
        assert_eq!(absent.image_url, None);

        let null: UpdateCategoryRequest =
            serde_json::from_str(r#"{"imageUrl":null}"#).expect("valid json");
        assert_eq!(null.image_url, Some(None));

        let set: UpdateCategoryRequest =
            serde_json::from_str(r#"{"imageUrl":"cat.jpg"}"#).expect("valid json");
        assert_eq!(set.image_url, Some(Some("cat.jpg".to_string())));
    }
}
