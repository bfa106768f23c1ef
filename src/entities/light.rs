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
        Dim => "dim",
        Color => "color",
        ColorTemperature => "color_temperature",
    }
}

wire_enum! {
    pub enum Attributes {
        State => "state",
        Hue => "hue",
        Saturation => "saturation",
        Brightness => "brightness",
        ColorTemperature => "color_temperature",
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
    pub enum Options {
        ColorTemperatureSteps => "color_temperature_steps",
    }
}

pub fn new<I>(id: impl Into<String>, name: impl IntoLanguageText, features: I) -> EntityBuilder
where
    I: IntoIterator<Item = Features>,
{
    Entity::builder(id, name, EntityType::Light).features(features)
}
