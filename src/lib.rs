// Remu Embed Playback Library

pub mod config;
pub mod dom;
pub mod env;
pub mod error;
pub mod events;
pub mod loader;
pub mod native;
pub mod player;
pub mod slot;
pub mod vendor;

#[cfg(test)]
mod fakes;

pub use config::EmbedConfig;
pub use dom::{ElementRef, HostElement};
pub use env::Environment;
pub use error::{PlayerError, Result};
pub use events::{LoadedEvent, PlayerOptions, TimeEvent};
pub use player::{PlaybackControl, Player, PlayerType};
pub use slot::PlayerSlot;
