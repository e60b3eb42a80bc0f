use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use menugen_common::api;

use crate::schema::{menu_items, organization_images, organizations, users};

#[derive(Queryable, Selectable, Identifiable, Debug, PartialEq)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub telegram_id: i64,
    pub is_owner: bool,
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub telegram_id: i64,
    pub is_owner: bool,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, PartialEq)]
#[diesel(belongs_to(User, foreign_key = owner_id))]
#[diesel(table_name = organizations)]
pub struct Organization {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: i32,
    pub menu_table_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = organizations)]
pub struct NewOrganization {
    pub name: String,
    pub description: Option<String>,
    pub owner_id: i32,
    pub menu_table_name: String,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, PartialEq)]
#[diesel(belongs_to(Organization))]
#[diesel(table_name = menu_items)]
pub struct MenuItem {
    pub id: i32,
    pub organization_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub category: String,
    pub subcategory: Option<String>,
    pub is_available: bool,
    pub image_name: Option<String>,
    pub position: i32,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = menu_items)]
pub struct NewMenuItem {
    pub organization_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub category: String,
    pub subcategory: Option<String>,
    pub is_available: bool,
    pub image_name: Option<String>,
    pub position: i32,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = organization_images)]
pub struct NewOrganizationImage {
    pub organization_id: i32,
    pub kind: String,
    pub original_filename: String,
    pub stored_filename: String,
}

impl From<User> for api::User {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            telegram_id: u.telegram_id,
            is_owner: u.is_owner,
            language: u.language,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

impl From<Organization> for api::Organization {
    fn from(o: Organization) -> Self {
        Self {
            id: o.id,
            name: o.name,
            description: o.description,
            owner_id: o.owner_id,
            menu_table_name: o.menu_table_name,
            created_at: o.created_at,
            updated_at: o.updated_at,
        }
    }
}

impl From<MenuItem> for api::MenuItem {
    fn from(i: MenuItem) -> Self {
        Self {
            id: i.id,
            name: i.name,
            description: i.description,
            price: i.price.with_scale(2).to_string(),
            category: i.category,
            subcategory: i.subcategory,
            is_available: i.is_available,
            image_name: i.image_name,
            created: i.created,
            updated: i.updated,
        }
    }
}
