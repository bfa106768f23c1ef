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
        Value => "value",
        Unit => "unit",
    }
}

wire_enum! {
    pub enum DeviceClasses {
        Custom => "custom",
        Battery => "battery",
        Current => "current",
        Energy => "energy",
        Humidity => "humidity",
        Power => "power",
        Temperature => "temperature",
        Voltage => "voltage",
    }
}

wire_enum! {
    pub enum Options {
        CustomUnit => "custom_unit",
        NativeUnit => "native_unit",
        Decimals => "decimals",
        MinValue => "min_value",
        MaxValue => "max_value",
    }
}

/// Read-only sensor; sensors have no features or commands
pub fn new(id: impl Into<String>, name: impl IntoLanguageText, device_class: DeviceClasses) -> EntityBuilder {
    Entity::builder(id, name, EntityType::Sensor).device_class(device_class)
}
