mod delay;
mod geolocation;

pub use crux_core::render::Render;
pub use crux_http::Http;
pub use crux_kv::KeyValue;

pub use self::delay::{Delay, DelayElapsed, DelayOperation};
pub use self::geolocation::{
    Geolocation, GeolocationError, GeolocationOperation, GeolocationResult, Position,
};

use crate::app::Event;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub http: Http<Event>,
    pub kv: KeyValue<Event>,
    pub render: Render<Event>,
    pub geolocation: Geolocation<Event>,
    pub delay: Delay<Event>,
}
