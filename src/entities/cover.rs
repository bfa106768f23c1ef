use crate::entity::{Entity, EntityBuilder, EntityType};
use crate::types::IntoLanguageText;

wire_enum! {
    pub enum States {
        Unavailable => "UNAVAILABLE",
        Unknown => "UNKNOWN",
        Opening => "OPENING",
        Open => "OPEN",
        Closing => "CLOSING",
        Closed => "CLOSED",
    }
}

wire_enum! {
    pub enum Features {
        Open => "open",
        Close => "close",
        Stop => "stop",
        Position => "position",
        Tilt => "tilt",
        TiltStop => "tilt_stop",
        TiltPosition => "tilt_position",
    }
}

wire_enum! {
    pub enum Attributes {
        State => "state",
        Position => "position",
        TiltPosition => "tilt_position",
    }
}

wire_enum! {
    pub enum Commands {
        Open => "open",
        Close => "close",
        Stop => "stop",
        Position => "position",
        Tilt => "tilt",
        TiltUp => "tilt_up",
        TiltDown => "tilt_down",
        TiltStop => "tilt_stop",
    }
}

wire_enum! {
    pub enum DeviceClasses {
        Blind => "blind",
        Curtain => "curtain",
        Garage => "garage",
        Shade => "shade",
        Door => "door",
        Gate => "gate",
        Window => "window",
    }
}

pub fn new<I>(id: impl Into<String>, name: impl IntoLanguageText, features: I) -> EntityBuilder
where
    I: IntoIterator<Item = Features>,
{
    Entity::builder(id, name, EntityType::Cover).features(features)
}
