//! HTML rendering of a menu page.

use askama::Template;
use menugen_common::group_by_category;
use menugen_common::page::{PageItem, PageRequest};

use crate::themes::Theme;

#[derive(Template)]
#[template(path = "menu.html")]
struct MenuPage {
    title: String,
    description: String,
    footer_text: String,
    stylesheet: String,
    page_background: String,
    header_background: String,
    footer_background: String,
    sections: Vec<SectionView>,
}

struct SectionView {
    category: String,
    groups: Vec<GroupView>,
}

/// Items sharing a subcategory. The unnamed group comes first when present.
struct GroupView {
    subcategory: String,
    items: Vec<ItemView>,
}

struct ItemView {
    name: String,
    price: String,
    description: String,
    image_url: String,
}

impl From<PageItem> for ItemView {
    fn from(item: PageItem) -> Self {
        Self {
            name: item.name,
            price: item.price,
            description: item.description.unwrap_or_default(),
            image_url: item.image_url.unwrap_or_default(),
        }
    }
}

fn theme_background(themes_base_url: &str, theme: &Theme, slot: &str) -> String {
    format!("{themes_base_url}/{}/{slot}.jpg", theme.id)
}

/// Percent-encodes the characters that could end a quoted CSS `url('...')`.
/// Attribute escaping is undone before the style is parsed, so HTML escaping
/// alone does not keep a URL inside the string.
fn css_url(url: &str) -> String {
    let mut encoded = String::with_capacity(url.len());
    for c in url.chars() {
        match c {
            '\'' | '"' | '(' | ')' | '\\' | '<' | '>' => {
                encoded.push_str(&format!("%{:02X}", c as u32));
            }
            c if c.is_whitespace() || c.is_control() => {
                let mut buf = [0u8; 4];
                for byte in c.encode_utf8(&mut buf).bytes() {
                    encoded.push_str(&format!("%{byte:02X}"));
                }
            }
            c => encoded.push(c),
        }
    }
    encoded
}

/// Renders `request` with `theme`. Sections keep their payload order.
pub fn render_page(
    request: &PageRequest,
    theme: &Theme,
    themes_base_url: &str,
) -> Result<String, askama::Error> {
    let background = |url: &Option<String>, slot: &str| {
        let url = url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| theme_background(themes_base_url, theme, slot));
        css_url(&url)
    };

    let sections = request
        .content
        .iter()
        .map(|section| {
            let mut groups = group_by_category(section.items.iter().cloned(), |item| {
                item.subcategory.as_deref().unwrap_or("")
            });
            if let Some(position) = groups.iter().position(|(name, _)| name.is_empty()) {
                let unnamed = groups.remove(position);
                groups.insert(0, unnamed);
            }
            SectionView {
                category: section.category.clone(),
                groups: groups
                    .into_iter()
                    .map(|(subcategory, items)| GroupView {
                        subcategory,
                        items: items.into_iter().map(ItemView::from).collect(),
                    })
                    .collect(),
            }
        })
        .collect();

    let organization = &request.organization;
    let title = if organization.title.trim().is_empty() {
        request.title.clone()
    } else {
        organization.title.clone()
    };

    MenuPage {
        title,
        description: organization
            .description
            .clone()
            .or_else(|| request.description.clone())
            .unwrap_or_default(),
        footer_text: organization.footer_text.clone().unwrap_or_default(),
        stylesheet: format!("{themes_base_url}/{}", theme.css_file),
        page_background: background(&request.page_background, "page"),
        header_background: background(&request.header_background, "header"),
        footer_background: background(&request.footer_background, "footer"),
        sections,
    }
    .render()
}
