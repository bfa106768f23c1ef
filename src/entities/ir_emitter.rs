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
    pub enum Features {
        SendIr => "send_ir",
    }
}

wire_enum! {
    pub enum Attributes {
        State => "state",
    }
}

wire_enum! {
    pub enum Commands {
        SendIr => "send_ir",
        StopIr => "stop_ir",
    }
}

wire_enum! {
    pub enum Options {
        Ports => "ports",
        IrFormats => "ir_formats",
    }
}

pub fn new(id: impl Into<String>, name: impl IntoLanguageText) -> EntityBuilder {
    Entity::builder(id, name, EntityType::IrEmitter).features([Features::SendIr])
}
