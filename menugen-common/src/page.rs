//! Payload accepted by the page generator.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageItem {
    pub name: String,
    pub price: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySection {
    pub category: String,
    pub items: Vec<PageItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationMeta {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub footer_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub org_id: i32,
    pub page_name: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub theme: String,
    /// Category name mapped to its items. Key order is the render order.
    #[serde(with = "ordered_content")]
    pub content: Vec<CategorySection>,
    #[serde(default)]
    pub page_background: Option<String>,
    #[serde(default)]
    pub header_background: Option<String>,
    #[serde(default)]
    pub footer_background: Option<String>,
    pub organization: OrganizationMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    /// The page was rendered by this request
    Generated,
    /// A page for the same organization and theme was already published
    Exists,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PageResponse {
    pub status: PageStatus,
    /// Public URL of the published page
    pub url: String,
}

/// Groups items by category. Categories keep the order in which they are first
/// seen and items keep their input order inside a category.
pub fn group_by_category<T, I, F>(items: I, category_of: F) -> Vec<(String, Vec<T>)>
where
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> &str,
{
    let mut groups: Vec<(String, Vec<T>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for item in items {
        let category = category_of(&item).to_string();
        match index.get(&category) {
            Some(&position) => groups[position].1.push(item),
            None => {
                index.insert(category.clone(), groups.len());
                groups.push((category, vec![item]));
            }
        }
    }
    groups
}

mod ordered_content {
    use std::fmt;

    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};

    use super::{CategorySection, PageItem};

    pub fn serialize<S>(sections: &[CategorySection], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(sections.len()))?;
        for section in sections {
            map.serialize_entry(&section.category, &section.items)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<CategorySection>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(SectionsVisitor)
    }

    struct SectionsVisitor;

    impl<'de> Visitor<'de> for SectionsVisitor {
        type Value = Vec<CategorySection>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a map of category name to menu items")
        }

        fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut sections: Vec<CategorySection> =
                Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((category, items)) = access.next_entry::<String, Vec<PageItem>>()? {
                match sections.iter_mut().find(|s| s.category == category) {
                    Some(section) => section.items.extend(items),
                    None => sections.push(CategorySection { category, items }),
                }
            }
            Ok(sections)
        }
    }
}
