//! Remote entity: simple commands, physical button mappings and UI pages.

use crate::entity::{Entity, EntityBuilder, EntityType};
use crate::types::IntoLanguageText;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

wire_enum! {
    pub enum States {
        Unavailable => "UNAVAILABLE",
        Unknown => "UNKNOWN",
        On => "ON",
        Off => "OFF",
    }
}

wire_enum! {
    pub enum Features {
        OnOff => "on_off",
        Toggle => "toggle",
        SendCmd => "send_cmd",
    }
}

wire_enum! {
    pub enum Attributes {
        State => "state",
    }
}

wire_enum! {
    pub enum Commands {
        On => "on",
        Off => "off",
        Toggle => "toggle",
        SendCmd => "send_cmd",
        SendCmdSequence => "send_cmd_sequence",
    }
}

wire_enum! {
    pub enum Options {
        SimpleCommands => "simple_commands",
        ButtonMapping => "button_mapping",
        UserInterface => "user_interface",
    }
}

wire_enum! {
    /// Physical buttons of the remote
    pub enum Buttons {
        Back => "BACK",
        Home => "HOME",
        Voice => "VOICE",
        VolumeUp => "VOLUME_UP",
        VolumeDown => "VOLUME_DOWN",
        Mute => "MUTE",
        DpadUp => "DPAD_UP",
        DpadDown => "DPAD_DOWN",
        DpadLeft => "DPAD_LEFT",
        DpadRight => "DPAD_RIGHT",
        DpadMiddle => "DPAD_MIDDLE",
        Green => "GREEN",
        Yellow => "YELLOW",
        Red => "RED",
        Blue => "BLUE",
        ChannelUp => "CHANNEL_UP",
        ChannelDown => "CHANNEL_DOWN",
        Prev => "PREV",
        Play => "PLAY",
        Next => "NEXT",
        Power => "POWER",
    }
}

/// Command definition used in button mappings and UI pages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityCommand {
    pub cmd_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Map<String, Value>>,
}

impl EntityCommand {
    pub fn new(cmd_id: impl Into<String>) -> Self {
        Self {
            cmd_id: cmd_id.into(),
            params: None,
        }
    }
}

impl From<&str> for EntityCommand {
    fn from(cmd_id: &str) -> Self {
        Self::new(cmd_id)
    }
}

fn put_nonzero(params: &mut serde_json::Map<String, Value>, key: &str, value: Option<u32>) {
    if let Some(value) = value.filter(|v| *v > 0) {
        params.insert(key.to_string(), json!(value));
    }
}

/// `send_cmd` command; delay and hold are in milliseconds
pub fn create_send_cmd(
    command: impl Into<String>,
    delay: Option<u32>,
    repeat: Option<u32>,
    hold: Option<u32>,
) -> EntityCommand {
    let mut params = serde_json::Map::new();
    params.insert("command".to_string(), Value::String(command.into()));
    put_nonzero(&mut params, "delay", delay);
    put_nonzero(&mut params, "repeat", repeat);
    put_nonzero(&mut params, "hold", hold);
    EntityCommand {
        cmd_id: Commands::SendCmd.into(),
        params: Some(params),
    }
}

/// `send_cmd_sequence` command; delay is in milliseconds between commands
pub fn create_sequence_cmd<I, S>(sequence: I, delay: Option<u32>, repeat: Option<u32>) -> EntityCommand
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let sequence: Vec<String> = sequence.into_iter().map(Into::into).collect();
    let mut params = serde_json::Map::new();
    params.insert("sequence".to_string(), json!(sequence));
    put_nonzero(&mut params, "delay", delay);
    put_nonzero(&mut params, "repeat", repeat);
    EntityCommand {
        cmd_id: Commands::SendCmdSequence.into(),
        params: Some(params),
    }
}

/// Command mapping of a physical button
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceButtonMapping {
    pub button: Buttons,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_press: Option<EntityCommand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_press: Option<EntityCommand>,
}

pub fn create_btn_mapping(
    button: Buttons,
    short: Option<EntityCommand>,
    long: Option<EntityCommand>,
) -> DeviceButtonMapping {
    DeviceButtonMapping {
        button,
        short_press: short,
        long_press: long,
    }
}

/// Item size in the button grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Default for Size {
    fn default() -> Self {
        Self { width: 1, height: 1 }
    }
}

/// 0-based grid position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiItemType {
    Icon,
    Text,
}

/// Icon or text item on a UI page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiItem {
    #[serde(rename = "type")]
    pub item_type: UiItemType,
    pub location: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<EntityCommand>,
}

pub fn create_ui_text(
    text: impl Into<String>,
    x: u32,
    y: u32,
    size: Option<Size>,
    cmd: Option<EntityCommand>,
) -> UiItem {
    UiItem {
        item_type: UiItemType::Text,
        location: Location { x, y },
        size,
        icon: None,
        text: Some(text.into()),
        command: cmd,
    }
}

/// Icon item. Identifiers are prefixed with `uc:` (icon font) or `custom:`.
pub fn create_ui_icon(
    icon: impl Into<String>,
    x: u32,
    y: u32,
    size: Option<Size>,
    cmd: Option<EntityCommand>,
) -> UiItem {
    UiItem {
        item_type: UiItemType::Icon,
        location: Location { x, y },
        size,
        icon: Some(icon.into()),
        text: None,
        command: cmd,
    }
}

/// A complete UI page, 4x6 grid unless specified
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiPage {
    pub page_id: String,
    pub name: String,
    pub grid: Size,
    pub items: Vec<UiItem>,
}

impl UiPage {
    pub fn new(page_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            page_id: page_id.into(),
            name: name.into(),
            grid: Size { width: 4, height: 6 },
            items: Vec::new(),
        }
    }

    pub fn with_grid(mut self, grid: Size) -> Self {
        self.grid = grid;
        self
    }

    pub fn add(&mut self, item: UiItem) {
        self.items.push(item);
    }
}

/// Remote entity with optional simple commands, button mapping and UI pages.
///
/// Empty collections are left out of the entity options.
pub fn new<I>(
    id: impl Into<String>,
    name: impl IntoLanguageText,
    features: I,
    simple_commands: &[&str],
    button_mapping: &[DeviceButtonMapping],
    ui_pages: &[UiPage],
) -> EntityBuilder
where
    I: IntoIterator<Item = Features>,
{
    let mut builder = Entity::builder(id, name, EntityType::Remote).features(features);
    if !simple_commands.is_empty() {
        builder = builder.option(Options::SimpleCommands, json!(simple_commands));
    }
    if !button_mapping.is_empty() {
        builder = builder.option(Options::ButtonMapping, json!(button_mapping));
    }
    if !ui_pages.is_empty() {
        builder = builder.option(Options::UserInterface, json!({ "pages": ui_pages }));
    }
    builder
}
