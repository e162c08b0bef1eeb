//! Fixed-choice menu items, shared by the descriptors and the typed handlers.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0:?} is not a menu item")]
pub struct UnknownMenuItem(pub String);

macro_rules! menu_items {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ITEMS: &'static [&'static str] = &[$($label),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownMenuItem;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok(Self::$variant),)+
                    other => Err(UnknownMenuItem(other.to_string())),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

menu_items! {
    Led { On => "ON", Off => "OFF" }
}

menu_items! {
    /// Bearing of the car's distance sensor servo, in degrees.
    SensorAngle {
        Deg0 => "0",
        Deg45 => "45",
        Deg90 => "90",
        Deg135 => "135",
        Deg180 => "180",
    }
}

menu_items! {
    Drive { Go => "GO", Stop => "STOP", Back => "BACK", BackTurn => "BACKTURN" }
}

menu_items! {
    TurnDirection { Right => "RIGHT", Left => "LEFT" }
}

menu_items! {
    /// Storage slot on the remote-control hub for a captured IR signal.
    IrSlot { One => "1", Two => "2", Three => "3", Four => "4", Five => "5" }
}

menu_items! {
    WebhookJob { Mail => "MAIL", Cloud => "CLOUD" }
}
