use crate::entity::{Entity, EntityBuilder, EntityType};
use crate::types::IntoLanguageText;

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
    }
}

wire_enum! {
    pub enum DeviceClasses {
        Outlet => "outlet",
        Switch => "switch",
    }
}

wire_enum! {
    pub enum Options {
        Readable => "readable",
    }
}

pub fn new<I>(id: impl Into<String>, name: impl IntoLanguageText, features: I) -> EntityBuilder
where
    I: IntoIterator<Item = Features>,
{
    Entity::builder(id, name, EntityType::Switch).features(features)
}
