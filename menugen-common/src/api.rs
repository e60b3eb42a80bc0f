//! JSON views exchanged between the API, the bot and the generator.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: i32,
    /// External (Telegram) identity, unique per user
    pub telegram_id: i64,
    pub is_owner: bool,
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Organization {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: i32,
    /// Identifier-safe key of the organization's menu, fixed at creation
    pub menu_table_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MenuItem {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    /// Fixed-point price with two decimals, e.g. "12.50"
    pub price: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub is_available: bool,
    pub image_name: Option<String>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UploadMenuResponse {
    /// Rows written by this upload
    pub inserted_count: usize,
    /// Rows of the previous menu that were replaced
    pub replaced_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UploadImagesResponse {
    /// Stored file names, relative to the organization's image directory
    pub uploaded_images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GenerateMenuRequest {
    /// Theme identifier as listed by `GET /themes`
    pub theme: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ThemesResponse {
    /// Theme id mapped to its display name
    pub themes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    pub row_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TableStructure {
    pub table_name: String,
    pub columns: Vec<ColumnInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TableData {
    pub table_name: String,
    pub row_count: i64,
    /// First rows of the table as JSON objects
    #[schema(value_type = Vec<Object>)]
    pub sample_data: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// Error message
    pub error: String,
}
