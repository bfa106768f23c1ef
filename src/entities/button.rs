use crate::entity::{Entity, EntityBuilder, EntityType};
use crate::types::IntoLanguageText;

wire_enum! {
    /// Button states
    pub enum States {
        Unavailable => "UNAVAILABLE",
        Available => "AVAILABLE",
    }
}

wire_enum! {
    pub enum Features {
        Press => "press",
    }
}

wire_enum! {
    pub enum Attributes {
        State => "state",
    }
}

wire_enum! {
    pub enum Commands {
        Push => "push",
    }
}

/// Push button, available by default
pub fn new(id: impl Into<String>, name: impl IntoLanguageText) -> EntityBuilder {
    Entity::builder(id, name, EntityType::Button)
        .features([Features::Press])
        .attribute(Attributes::State, States::Available)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults() {
        let button = new("b1", "Push me").build();
        assert_eq!(button.entity_type(), EntityType::Button);
        assert_eq!(button.features(), ["press".to_string()]);
        assert_eq!(button.attribute("state"), Some(json!("AVAILABLE")));
    }
}
