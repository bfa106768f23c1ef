use crate::entity::{Entity, EntityBuilder, EntityType};
use crate::types::IntoLanguageText;

wire_enum! {
    pub enum States {
        Unavailable => "UNAVAILABLE",
        Unknown => "UNKNOWN",
        Off => "OFF",
        Heat => "HEAT",
        Cool => "COOL",
        HeatCool => "HEAT_COOL",
        Fan => "FAN",
        Auto => "AUTO",
    }
}

wire_enum! {
    pub enum Features {
        OnOff => "on_off",
        Heat => "heat",
        Cool => "cool",
        CurrentTemperature => "current_temperature",
        TargetTemperature => "target_temperature",
        TargetTemperatureRange => "target_temperature_range",
        Fan => "fan",
    }
}

wire_enum! {
    pub enum Attributes {
        State => "state",
        CurrentTemperature => "current_temperature",
        TargetTemperature => "target_temperature",
        TargetTemperatureHigh => "target_temperature_high",
        TargetTemperatureLow => "target_temperature_low",
        FanMode => "fan_mode",
    }
}

wire_enum! {
    pub enum Commands {
        On => "on",
        Off => "off",
        HvacMode => "hvac_mode",
        TargetTemperature => "target_temperature",
        TargetTemperatureRange => "target_temperature_range",
        FanMode => "fan_mode",
    }
}

wire_enum! {
    pub enum Options {
        TemperatureUnit => "temperature_unit",
        TargetTemperatureStep => "target_temperature_step",
        MaxTemperature => "max_temperature",
        MinTemperature => "min_temperature",
        FanModes => "fan_modes",
    }
}

pub fn new<I>(id: impl Into<String>, name: impl IntoLanguageText, features: I) -> EntityBuilder
where
    I: IntoIterator<Item = Features>,
{
    Entity::builder(id, name, EntityType::Climate).features(features)
}
