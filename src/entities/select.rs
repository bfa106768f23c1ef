use crate::entity::{Entity, EntityBuilder, EntityType};
use crate::types::IntoLanguageText;

wire_enum! {
    pub enum States {
        Unavailable => "UNAVAILABLE",
        Unknown => "UNKNOWN",
        On => "ON",
    }
}

wire_enum! {
    pub enum Attributes {
        State => "state",
        CurrentOption => "current_option",
        Options => "options",
    }
}

wire_enum! {
    pub enum Commands {
        SelectOption => "select_option",
        SelectFirst => "select_first",
        SelectLast => "select_last",
        SelectNext => "select_next",
        SelectPrevious => "select_previous",
    }
}

pub fn new(id: impl Into<String>, name: impl IntoLanguageText) -> EntityBuilder {
    Entity::builder(id, name, EntityType::Select)
}
