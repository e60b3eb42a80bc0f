//! Conversation state machine.
//!
//! [`transition`] is pure: it maps the current state and an incoming event to
//! the next state and the side effect the dispatcher should run. Backend calls
//! happen only in [`crate::dialogue`].

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackgroundSlot {
    Page,
    Header,
    Footer,
}

impl BackgroundSlot {
    pub const ALL: [BackgroundSlot; 3] = [Self::Page, Self::Header, Self::Footer];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Header => "header",
            Self::Footer => "footer",
        }
    }
}

impl fmt::Display for BackgroundSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackgroundSlot {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|slot| slot.as_str() == s).ok_or(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum State {
    #[default]
    Idle,
    AwaitingOrgName,
    AwaitingOrgDescription {
        name: String,
    },
    AwaitingMenuFile {
        name: String,
        description: Option<String>,
    },
    AwaitingMenuReplacement {
        org_id: i32,
    },
    AwaitingImages {
        org_id: i32,
    },
    AwaitingBackground {
        org_id: i32,
        slot: BackgroundSlot,
    },
    AwaitingTheme {
        org_id: i32,
    },
}

impl State {
    /// What the user is expected to send next.
    pub fn hint(&self) -> &'static str {
        match self {
            State::Idle => "Choose an action from the menu, or send /help.",
            State::AwaitingOrgName => "Send the organization name as a text message, or /cancel.",
            State::AwaitingOrgDescription { .. } => {
                "Send a short description, press Skip, or /cancel."
            }
            State::AwaitingMenuFile { .. } | State::AwaitingMenuReplacement { .. } => {
                "Send the menu as a .csv, .xls or .xlsx file, or /cancel."
            }
            State::AwaitingImages { .. } => {
                "Send images as files (.jpg, .jpeg or .png), then press Done."
            }
            State::AwaitingBackground { .. } => "Send the background image as a file, or /cancel.",
            State::AwaitingTheme { .. } => "Pick a theme from the list, or /cancel.",
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub enum Event {
    Start,
    Help,
    Cancel,
    CreateOrganization,
    MyOrganizations,
    OpenOrganization(i32),
    ShowMenu(i32),
    ReplaceMenu(i32),
    UploadImages(i32),
    UploadBackground(i32, BackgroundSlot),
    GeneratePage(i32),
    SelectTheme(String),
    Skip,
    Done,
    Text(String),
    Document { file_name: String, bytes: Vec<u8> },
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Document { file_name, bytes } => f
                .debug_struct("Document")
                .field("file_name", file_name)
                .field("len", &bytes.len())
                .finish(),
            Event::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Event::SelectTheme(theme) => f.debug_tuple("SelectTheme").field(theme).finish(),
            Event::OpenOrganization(id) => f.debug_tuple("OpenOrganization").field(id).finish(),
            Event::ShowMenu(id) => f.debug_tuple("ShowMenu").field(id).finish(),
            Event::ReplaceMenu(id) => f.debug_tuple("ReplaceMenu").field(id).finish(),
            Event::UploadImages(id) => f.debug_tuple("UploadImages").field(id).finish(),
            Event::UploadBackground(id, slot) => f
                .debug_tuple("UploadBackground")
                .field(id)
                .field(slot)
                .finish(),
            Event::GeneratePage(id) => f.debug_tuple("GeneratePage").field(id).finish(),
            Event::Start => f.write_str("Start"),
            Event::Help => f.write_str("Help"),
            Event::Cancel => f.write_str("Cancel"),
            Event::CreateOrganization => f.write_str("CreateOrganization"),
            Event::MyOrganizations => f.write_str("MyOrganizations"),
            Event::Skip => f.write_str("Skip"),
            Event::Done => f.write_str("Done"),
        }
    }
}

impl Event {
    /// Parses a plain message. Commands map to their events, anything else is
    /// free text.
    pub fn from_text(text: &str) -> Self {
        match text.trim() {
            "/start" => Event::Start,
            "/help" => Event::Help,
            "/cancel" => Event::Cancel,
            _ => Event::Text(text.to_string()),
        }
    }

    /// Parses button callback data such as `bg:12:header`.
    pub fn from_callback(data: &str) -> Option<Self> {
        let mut parts = data.split(':');
        let action = parts.next()?;
        let event = match action {
            "create" => Event::CreateOrganization,
            "orgs" => Event::MyOrganizations,
            "skip" => Event::Skip,
            "done" => Event::Done,
            "cancel" => Event::Cancel,
            "help" => Event::Help,
            "theme" => Event::SelectTheme(parts.next().filter(|t| !t.is_empty())?.to_string()),
            _ => {
                let org_id: i32 = parts.next()?.parse().ok()?;
                match action {
                    "org" => Event::OpenOrganization(org_id),
                    "menu" => Event::ShowMenu(org_id),
                    "replace" => Event::ReplaceMenu(org_id),
                    "images" => Event::UploadImages(org_id),
                    "generate" => Event::GeneratePage(org_id),
                    "bg" => Event::UploadBackground(org_id, parts.next()?.parse().ok()?),
                    _ => return None,
                }
            }
        };
        if parts.next().is_some() {
            return None;
        }
        Some(event)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::Start => "start",
            Event::Help => "help",
            Event::Cancel => "cancel",
            Event::CreateOrganization => "create_organization",
            Event::MyOrganizations => "my_organizations",
            Event::OpenOrganization(_) => "open_organization",
            Event::ShowMenu(_) => "show_menu",
            Event::ReplaceMenu(_) => "replace_menu",
            Event::UploadImages(_) => "upload_images",
            Event::UploadBackground(..) => "upload_background",
            Event::GeneratePage(_) => "generate_page",
            Event::SelectTheme(_) => "select_theme",
            Event::Skip => "skip",
            Event::Done => "done",
            Event::Text(_) => "text",
            Event::Document { .. } => "document",
        }
    }
}

/// Side effect requested by a transition.
#[derive(Clone, PartialEq, Eq)]
pub enum Effect {
    MainMenu,
    Help,
    Cancelled,
    Say(String),
    Hint(&'static str),
    ListOrganizations,
    ShowOrganization(i32),
    ShowMenu(i32),
    ListThemes,
    ProvisionOrganization {
        name: String,
        description: Option<String>,
        file_name: String,
        bytes: Vec<u8>,
    },
    UploadMenu {
        org_id: i32,
        file_name: String,
        bytes: Vec<u8>,
    },
    UploadImage {
        org_id: i32,
        file_name: String,
        bytes: Vec<u8>,
    },
    UploadBackground {
        org_id: i32,
        slot: BackgroundSlot,
        file_name: String,
        bytes: Vec<u8>,
    },
    GeneratePage {
        org_id: i32,
        theme: String,
    },
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::MainMenu => f.write_str("MainMenu"),
            Effect::Help => f.write_str("Help"),
            Effect::Cancelled => f.write_str("Cancelled"),
            Effect::Say(text) => f.debug_tuple("Say").field(text).finish(),
            Effect::Hint(text) => f.debug_tuple("Hint").field(text).finish(),
            Effect::ListOrganizations => f.write_str("ListOrganizations"),
            Effect::ShowOrganization(id) => f.debug_tuple("ShowOrganization").field(id).finish(),
            Effect::ShowMenu(id) => f.debug_tuple("ShowMenu").field(id).finish(),
            Effect::ListThemes => f.write_str("ListThemes"),
            Effect::ProvisionOrganization {
                name, file_name, ..
            } => f
                .debug_struct("ProvisionOrganization")
                .field("name", name)
                .field("file_name", file_name)
                .finish_non_exhaustive(),
            Effect::UploadMenu {
                org_id, file_name, ..
            } => f
                .debug_struct("UploadMenu")
                .field("org_id", org_id)
                .field("file_name", file_name)
                .finish_non_exhaustive(),
            Effect::UploadImage {
                org_id, file_name, ..
            } => f
                .debug_struct("UploadImage")
                .field("org_id", org_id)
                .field("file_name", file_name)
                .finish_non_exhaustive(),
            Effect::UploadBackground {
                org_id,
                slot,
                file_name,
                ..
            } => f
                .debug_struct("UploadBackground")
                .field("org_id", org_id)
                .field("slot", slot)
                .field("file_name", file_name)
                .finish_non_exhaustive(),
            Effect::GeneratePage { org_id, theme } => f
                .debug_struct("GeneratePage")
                .field("org_id", org_id)
                .field("theme", theme)
                .finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: State,
    pub effect: Effect,
}

impl Transition {
    fn to(next: State, effect: Effect) -> Self {
        Self { next, effect }
    }
}

pub const ASK_NAME: &str = "What is the name of your organization?";
pub const ASK_DESCRIPTION: &str = "Send a short description of the organization, or press Skip.";
pub const ASK_MENU: &str = "Send the menu as a .csv, .xls or .xlsx file with columns name, price and category.";
pub const ASK_IMAGES: &str =
    "Send images as files. Name them after menu items, or logo.jpg for the logo. Press Done when finished.";

pub fn transition(state: State, event: Event) -> Transition {
    match (state, event) {
        (_, Event::Cancel) => Transition::to(State::Idle, Effect::Cancelled),
        (_, Event::Start) => Transition::to(State::Idle, Effect::MainMenu),
        (state, Event::Help) => Transition::to(state, Effect::Help),

        (State::Idle, Event::CreateOrganization) => {
            Transition::to(State::AwaitingOrgName, Effect::Say(ASK_NAME.to_string()))
        }
        (State::Idle, Event::MyOrganizations) => {
            Transition::to(State::Idle, Effect::ListOrganizations)
        }
        (State::Idle, Event::OpenOrganization(org_id)) => {
            Transition::to(State::Idle, Effect::ShowOrganization(org_id))
        }
        (State::Idle, Event::ShowMenu(org_id)) => {
            Transition::to(State::Idle, Effect::ShowMenu(org_id))
        }
        (State::Idle, Event::ReplaceMenu(org_id)) => Transition::to(
            State::AwaitingMenuReplacement { org_id },
            Effect::Say(ASK_MENU.to_string()),
        ),
        (State::Idle, Event::UploadImages(org_id)) => Transition::to(
            State::AwaitingImages { org_id },
            Effect::Say(ASK_IMAGES.to_string()),
        ),
        (State::Idle, Event::UploadBackground(org_id, slot)) => Transition::to(
            State::AwaitingBackground { org_id, slot },
            Effect::Say(format!("Send the {slot} background image as a file.")),
        ),
        (State::Idle, Event::GeneratePage(org_id)) => {
            Transition::to(State::AwaitingTheme { org_id }, Effect::ListThemes)
        }

        (State::AwaitingOrgName, Event::Text(text)) if !text.trim().is_empty() => {
            Transition::to(
                State::AwaitingOrgDescription {
                    name: text.trim().to_string(),
                },
                Effect::Say(ASK_DESCRIPTION.to_string()),
            )
        }
        (State::AwaitingOrgDescription { name }, Event::Text(text)) => {
            let description = Some(text.trim().to_string()).filter(|d| !d.is_empty());
            Transition::to(
                State::AwaitingMenuFile { name, description },
                Effect::Say(ASK_MENU.to_string()),
            )
        }
        (State::AwaitingOrgDescription { name }, Event::Skip) => Transition::to(
            State::AwaitingMenuFile {
                name,
                description: None,
            },
            Effect::Say(ASK_MENU.to_string()),
        ),
        (State::AwaitingMenuFile { name, description }, Event::Document { file_name, bytes }) => {
            Transition::to(
                State::Idle,
                Effect::ProvisionOrganization {
                    name,
                    description,
                    file_name,
                    bytes,
                },
            )
        }
        (State::AwaitingMenuReplacement { org_id }, Event::Document { file_name, bytes }) => {
            Transition::to(
                State::Idle,
                Effect::UploadMenu {
                    org_id,
                    file_name,
                    bytes,
                },
            )
        }
        (State::AwaitingImages { org_id }, Event::Document { file_name, bytes }) => {
            Transition::to(
                State::AwaitingImages { org_id },
                Effect::UploadImage {
                    org_id,
                    file_name,
                    bytes,
                },
            )
        }
        (State::AwaitingImages { org_id }, Event::Done) => {
            Transition::to(State::Idle, Effect::ShowOrganization(org_id))
        }
        (State::AwaitingBackground { org_id, slot }, Event::Document { file_name, bytes }) => {
            Transition::to(
                State::Idle,
                Effect::UploadBackground {
                    org_id,
                    slot,
                    file_name,
                    bytes,
                },
            )
        }
        (State::AwaitingTheme { org_id }, Event::SelectTheme(theme)) => {
            Transition::to(State::Idle, Effect::GeneratePage { org_id, theme })
        }

        (state, _) => {
            let hint = state.hint();
            Transition::to(state, Effect::Hint(hint))
        }
    }
}
