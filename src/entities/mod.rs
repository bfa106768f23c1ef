//! Entity shapes: attribute, feature and command vocabularies per entity type.
//!
//! Shapes carry no behavior. Each module exposes its string enums and a
//! constructor returning a preconfigured [`EntityBuilder`](crate::EntityBuilder).

/// Declare a string-valued wire enum
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $value:literal),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $($(#[$vmeta])* #[serde(rename = $value)] $variant),*
        }

        impl $name {
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $value),*
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }

        impl From<$name> for serde_json::Value {
            fn from(value: $name) -> Self {
                serde_json::Value::String(value.as_str().to_string())
            }
        }
    };
}

pub mod button;
pub mod climate;
pub mod cover;
pub mod ir_emitter;
pub mod light;
pub mod media_player;
pub mod remote;
pub mod select;
pub mod sensor;
pub mod switch;
pub mod voice_assistant;
