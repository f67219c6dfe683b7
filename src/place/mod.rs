pub mod types;

pub use types::{PlaceRecord, PlaceSignal, PolicyLevel, WeatherSignal};
