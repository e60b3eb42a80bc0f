//! Users, organizations and their menus.
//!
//! Every function takes a borrowed connection and runs synchronously; callers
//! on the async side go through [`crate::db::with_connection`].

use std::collections::HashSet;

use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::upsert::excluded;
use diesel::{delete, insert_into, update};
use menugen_common::api::UploadMenuResponse;

use crate::error::ApiError;
use crate::ingest::MenuRow;
use crate::models::{
    MenuItem, NewMenuItem, NewOrganization, NewOrganizationImage, NewUser, Organization, User,
};
use crate::naming::{is_valid_identifier, menu_table_name, next_timestamp_millis};
use crate::schema::{menu_items, organization_images, organizations, users};

pub const DEFAULT_LIMIT: i64 = 100;
pub const MAX_LIMIT: i64 = 1000;
const INSERT_CHUNK: usize = 1000;

/// Offset pagination with a bounded page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: i64,
    pub limit: i64,
}

impl Page {
    pub fn new(skip: Option<i64>, limit: Option<i64>) -> Result<Self, ApiError> {
        let skip = skip.unwrap_or(0);
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        if skip < 0 {
            return Err(ApiError::Validation("skip must not be negative".to_string()));
        }
        if limit <= 0 {
            return Err(ApiError::Validation("limit must be positive".to_string()));
        }
        Ok(Self {
            skip,
            limit: limit.min(MAX_LIMIT),
        })
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Returns the user with `telegram_id`, creating it on first contact.
/// Concurrent calls for one id converge on a single row.
pub fn register_user(conn: &mut PgConnection, telegram_id: i64) -> Result<User, ApiError> {
    conn.transaction::<_, ApiError, _>(|conn| {
        let created = insert_into(users::table)
            .values(&NewUser {
                telegram_id,
                is_owner: false,
            })
            .on_conflict(users::telegram_id)
            .do_nothing()
            .execute(conn)?;

        let user = users::table
            .filter(users::telegram_id.eq(telegram_id))
            .select(User::as_select())
            .first(conn)?;

        if created > 0 {
            tracing::info!(user_id = user.id, telegram_id, "Registered user");
        }
        Ok(user)
    })
}

pub fn get_user_by_telegram_id(conn: &mut PgConnection, telegram_id: i64) -> Result<User, ApiError> {
    users::table
        .filter(users::telegram_id.eq(telegram_id))
        .select(User::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound(format!("user with telegram id {telegram_id} not found")))
}

pub fn create_organization(
    conn: &mut PgConnection,
    name: &str,
    description: Option<&str>,
    owner_id: i32,
) -> Result<Organization, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation(
            "organization name must not be empty".to_string(),
        ));
    }
    let description = description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    let table_name = menu_table_name(name, next_timestamp_millis());
    if !is_valid_identifier(&table_name) {
        return Err(ApiError::Internal(format!(
            "derived menu name {table_name:?} is not a valid identifier"
        )));
    }

    conn.transaction::<_, ApiError, _>(|conn| {
        let owner_exists = users::table
            .find(owner_id)
            .select(users::id)
            .for_update()
            .first::<i32>(conn)
            .optional()?
            .is_some();
        if !owner_exists {
            return Err(ApiError::Validation(format!("owner {owner_id} does not exist")));
        }

        let organization = insert_into(organizations::table)
            .values(&NewOrganization {
                name: name.to_string(),
                description,
                owner_id,
                menu_table_name: table_name.clone(),
            })
            .returning(Organization::as_returning())
            .get_result(conn)
            .map_err(|e| match e {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    ApiError::Conflict(format!("menu name {table_name} is already taken"))
                }
                other => other.into(),
            })?;

        update(users::table.find(owner_id))
            .set(users::is_owner.eq(true))
            .execute(conn)?;

        tracing::info!(
            org_id = organization.id,
            owner_id,
            menu_table_name = %organization.menu_table_name,
            "Created organization"
        );
        Ok(organization)
    })
}

pub fn get_organization(conn: &mut PgConnection, org_id: i32) -> Result<Organization, ApiError> {
    organizations::table
        .find(org_id)
        .select(Organization::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| organization_not_found(org_id))
}

pub fn list_organizations(
    conn: &mut PgConnection,
    owner_id: Option<i32>,
    page: Page,
) -> Result<Vec<Organization>, ApiError> {
    let mut query = organizations::table
        .select(Organization::as_select())
        .order(organizations::id.asc())
        .into_boxed();
    if let Some(owner_id) = owner_id {
        query = query.filter(organizations::owner_id.eq(owner_id));
    }
    Ok(query.offset(page.skip).limit(page.limit).load(conn)?)
}

/// Replaces the whole menu of an organization with `rows`, in file order.
pub fn replace_menu(
    conn: &mut PgConnection,
    org_id: i32,
    rows: Vec<MenuRow>,
) -> Result<UploadMenuResponse, ApiError> {
    let items = rows
        .into_iter()
        .enumerate()
        .map(|(position, row)| NewMenuItem {
            organization_id: org_id,
            name: row.name,
            description: row.description,
            price: row.price,
            category: row.category,
            subcategory: row.subcategory,
            is_available: row.is_available,
            image_name: row.image_name,
            position: position as i32,
        })
        .collect::<Vec<_>>();

    conn.transaction::<_, ApiError, _>(|conn| {
        // Row lock serializes concurrent uploads for one organization.
        organizations::table
            .find(org_id)
            .select(organizations::id)
            .for_update()
            .first::<i32>(conn)
            .optional()?
            .ok_or_else(|| organization_not_found(org_id))?;

        let replaced_count =
            delete(menu_items::table.filter(menu_items::organization_id.eq(org_id))).execute(conn)?;

        let mut inserted_count = 0;
        for chunk in items.chunks(INSERT_CHUNK) {
            inserted_count += insert_into(menu_items::table).values(chunk).execute(conn)?;
        }

        tracing::info!(org_id, inserted_count, replaced_count, "Replaced menu");
        Ok(UploadMenuResponse {
            inserted_count,
            replaced_count,
        })
    })
}

pub fn list_menu(
    conn: &mut PgConnection,
    org_id: i32,
    category: Option<&str>,
    page: Page,
) -> Result<Vec<MenuItem>, ApiError> {
    get_organization(conn, org_id)?;

    let mut query = menu_items::table
        .filter(menu_items::organization_id.eq(org_id))
        .select(MenuItem::as_select())
        .order((menu_items::position.asc(), menu_items::id.asc()))
        .into_boxed();
    if let Some(category) = category {
        query = query.filter(menu_items::category.eq(category.to_string()));
    }
    Ok(query.offset(page.skip).limit(page.limit).load(conn)?)
}

/// Distinct categories in the order they first appear in the menu.
pub fn list_categories(conn: &mut PgConnection, org_id: i32) -> Result<Vec<String>, ApiError> {
    get_organization(conn, org_id)?;

    let categories = menu_items::table
        .filter(menu_items::organization_id.eq(org_id))
        .select(menu_items::category)
        .order((menu_items::position.asc(), menu_items::id.asc()))
        .load::<String>(conn)?;

    let mut seen = HashSet::new();
    Ok(categories
        .into_iter()
        .filter(|c| seen.insert(c.clone()))
        .collect())
}

/// Items shown on a published page, in menu order.
pub fn available_menu(conn: &mut PgConnection, org_id: i32) -> Result<Vec<MenuItem>, ApiError> {
    Ok(menu_items::table
        .filter(menu_items::organization_id.eq(org_id))
        .filter(menu_items::is_available.eq(true))
        .select(MenuItem::as_select())
        .order((menu_items::position.asc(), menu_items::id.asc()))
        .load(conn)?)
}

/// Upserts metadata of stored images, keyed by stored file name.
pub fn record_images(
    conn: &mut PgConnection,
    images: &[NewOrganizationImage],
) -> Result<usize, ApiError> {
    if images.is_empty() {
        return Ok(0);
    }
    Ok(insert_into(organization_images::table)
        .values(images)
        .on_conflict((
            organization_images::organization_id,
            organization_images::stored_filename,
        ))
        .do_update()
        .set((
            organization_images::kind.eq(excluded(organization_images::kind)),
            organization_images::original_filename
                .eq(excluded(organization_images::original_filename)),
        ))
        .execute(conn)?)
}

fn organization_not_found(org_id: i32) -> ApiError {
    ApiError::NotFound(format!("organization {org_id} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults_and_cap() {
        assert_eq!(Page::new(None, None).unwrap(), Page::default());
        assert_eq!(Page::new(Some(5), Some(5000)).unwrap().limit, MAX_LIMIT);
        assert!(Page::new(Some(-1), None).is_err());
        assert!(Page::new(None, Some(0)).is_err());
    }
}
