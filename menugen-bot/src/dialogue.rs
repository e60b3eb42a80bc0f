//! Runs transitions and their effects for each incoming event.

use menugen_common::group_by_category;
use menugen_common::page::PageStatus;
use tracing::instrument;

use crate::backend::{Backend, BackendError};
use crate::fsm::{self, BackgroundSlot, Effect, Event, State, Transition};
use crate::session::Sessions;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    /// Data passed back through [`Event::from_callback`]
    pub callback: String,
}

impl Button {
    fn new(label: impl Into<String>, callback: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            callback: callback.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub buttons: Vec<Button>,
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    fn with_buttons(mut self, buttons: Vec<Button>) -> Self {
        self.buttons = buttons;
        self
    }

    fn main_menu(text: impl Into<String>) -> Self {
        Self::text(text).with_buttons(main_menu_buttons())
    }
}

const WELCOME: &str = "Welcome! I can publish your menu as a web page. Create an organization to get started.";
const HELP: &str = "Create an organization, upload its menu as a CSV or Excel file, add images and backgrounds, then generate a page in the theme of your choice. Send /cancel to abort the current step.";

fn main_menu_buttons() -> Vec<Button> {
    vec![
        Button::new("Create organization", "create"),
        Button::new("My organizations", "orgs"),
    ]
}

fn organization_buttons(org_id: i32) -> Vec<Button> {
    let mut buttons = vec![
        Button::new("Show menu", format!("menu:{org_id}")),
        Button::new("Replace menu", format!("replace:{org_id}")),
        Button::new("Upload images", format!("images:{org_id}")),
    ];
    for slot in BackgroundSlot::ALL {
        buttons.push(Button::new(
            format!("{} background", capitalize(slot.as_str())),
            format!("bg:{org_id}:{slot}"),
        ));
    }
    buttons.push(Button::new("Generate page", format!("generate:{org_id}")));
    buttons
}

/// Buttons offered while waiting for input in `state`.
fn step_buttons(state: &State) -> Vec<Button> {
    match state {
        State::Idle => main_menu_buttons(),
        State::AwaitingOrgDescription { .. } => vec![
            Button::new("Skip", "skip"),
            Button::new("Cancel", "cancel"),
        ],
        State::AwaitingImages { .. } => vec![
            Button::new("Done", "done"),
            Button::new("Cancel", "cancel"),
        ],
        _ => vec![Button::new("Cancel", "cancel")],
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub struct Dialogue<B> {
    backend: B,
    sessions: Sessions,
}

impl<B: Backend> Dialogue<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            sessions: Sessions::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn sessions(&self) -> &Sessions {
        &self.sessions
    }

    /// Applies `event` to the user's session and returns the reply. A failed
    /// backend call returns the user to the main menu.
    #[instrument(skip(self, event), fields(event = event.kind()))]
    pub async fn handle(&self, user_id: i64, event: Event) -> Reply {
        let session = self.sessions.session(user_id);
        let reply = {
            let mut state = session.lock().await;

            let Transition { next, effect } =
                fsm::transition(std::mem::take(&mut *state), event);
            tracing::debug!(?next, ?effect, "Transition");

            match self.run(user_id, &next, effect).await {
                Ok(reply) => {
                    *state = next;
                    reply
                }
                Err(e) => {
                    tracing::warn!("Backend call failed: {e}");
                    *state = State::Idle;
                    Reply::main_menu(e.user_message())
                }
            }
        };
        drop(session);
        self.sessions.release(user_id);
        reply
    }

    async fn run(&self, user_id: i64, next: &State, effect: Effect) -> Result<Reply, BackendError> {
        let reply = match effect {
            Effect::MainMenu => Reply::main_menu(WELCOME),
            Effect::Help => Reply::text(HELP).with_buttons(step_buttons(next)),
            Effect::Cancelled => Reply::main_menu("Cancelled."),
            Effect::Say(text) => Reply::text(text).with_buttons(step_buttons(next)),
            Effect::Hint(hint) => Reply::text(hint).with_buttons(step_buttons(next)),
            Effect::ListOrganizations => {
                let user = self.backend.register_user(user_id).await?;
                let organizations = self.backend.list_organizations(user.id).await?;
                if organizations.is_empty() {
                    Reply::main_menu("You have no organizations yet.")
                } else {
                    let buttons = organizations
                        .iter()
                        .map(|org| Button::new(org.name.clone(), format!("org:{}", org.id)))
                        .collect();
                    Reply::text("Your organizations:").with_buttons(buttons)
                }
            }
            Effect::ShowOrganization(org_id) => {
                let org = self.backend.get_organization(org_id).await?;
                let mut text = org.name.clone();
                if let Some(description) = &org.description {
                    text.push('\n');
                    text.push_str(description);
                }
                Reply::text(text).with_buttons(organization_buttons(org.id))
            }
            Effect::ShowMenu(org_id) => {
                let items = self.backend.list_menu(org_id).await?;
                Reply::text(format_menu(&items)).with_buttons(organization_buttons(org_id))
            }
            Effect::ListThemes => {
                let themes = self.backend.themes().await?.themes;
                if themes.is_empty() {
                    return Err(BackendError::Unavailable("no themes available".to_string()));
                }
                let buttons = themes
                    .into_iter()
                    .map(|(id, display_name)| Button::new(display_name, format!("theme:{id}")))
                    .chain(std::iter::once(Button::new("Cancel", "cancel")))
                    .collect();
                Reply::text("Choose a theme for the page:").with_buttons(buttons)
            }
            Effect::ProvisionOrganization {
                name,
                description,
                file_name,
                bytes,
            } => {
                let user = self.backend.register_user(user_id).await?;
                let org = self
                    .backend
                    .create_organization(&name, description.as_deref(), user.id)
                    .await?;
                tracing::info!(org_id = org.id, "Organization created");
                match self.backend.upload_menu(org.id, &file_name, bytes).await {
                    Ok(uploaded) => Reply::text(format!(
                        "Organization \"{}\" created with {} menu items.",
                        org.name, uploaded.inserted_count
                    )),
                    Err(e) => Reply::text(format!(
                        "Organization \"{}\" created, but the menu was not stored. {} Use \"Replace menu\" to try again.",
                        org.name,
                        e.user_message()
                    )),
                }
                .with_buttons(organization_buttons(org.id))
            }
            Effect::UploadMenu {
                org_id,
                file_name,
                bytes,
            } => {
                let uploaded = self.backend.upload_menu(org_id, &file_name, bytes).await?;
                Reply::text(format!(
                    "Menu replaced: {} items stored, {} previous items removed.",
                    uploaded.inserted_count, uploaded.replaced_count
                ))
                .with_buttons(organization_buttons(org_id))
            }
            Effect::UploadImage {
                org_id,
                file_name,
                bytes,
            } => {
                let uploaded = self.backend.upload_image(org_id, &file_name, bytes).await?;
                Reply::text(format!(
                    "Stored {}. Send more images or press Done.",
                    uploaded.uploaded_images.join(", ")
                ))
                .with_buttons(step_buttons(next))
            }
            Effect::UploadBackground {
                org_id,
                slot,
                file_name,
                bytes,
            } => {
                self.backend
                    .upload_background(org_id, slot, &file_name, bytes)
                    .await?;
                Reply::text(format!("{} background stored.", capitalize(slot.as_str())))
                    .with_buttons(organization_buttons(org_id))
            }
            Effect::GeneratePage { org_id, theme } => {
                let page = self.backend.generate_page(org_id, &theme).await?;
                let text = match page.status {
                    PageStatus::Generated => format!("Your menu page is ready: {}", page.url),
                    PageStatus::Exists => format!("Your menu page: {}", page.url),
                };
                Reply::text(text).with_buttons(organization_buttons(org_id))
            }
        };
        Ok(reply)
    }
}

fn format_menu(items: &[menugen_common::api::MenuItem]) -> String {
    if items.is_empty() {
        return "The menu is empty.".to_string();
    }
    let mut text = String::new();
    for (category, items) in group_by_category(items, |item| item.category.as_str()) {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&category);
        text.push('\n');
        for item in items {
            text.push_str(&format!("  {}: {}", item.name, item.price));
            if !item.is_available {
                text.push_str(" (unavailable)");
            }
            text.push('\n');
        }
    }
    text
}
