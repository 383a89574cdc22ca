//! Capability wiring.
//!
//! Only two capabilities survive at this boundary: HTTP (the shell executes
//! the requests this core describes) and Render. Everything else the shell
//! does — navigation, session persistence, notifications — never crosses
//! into the core.

pub use crux_core::render::Render;
pub use crux_http::Http;

use crate::app::App;
use crate::event::Event;

pub type AppHttp = Http<Event>;
pub type AppRender = Render<Event>;

#[derive(crux_core::macros::Effect)]
#[effect(app = "App")]
pub struct Capabilities {
    pub http: Http<Event>,
    pub render: Render<Event>,
}
