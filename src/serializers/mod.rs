mod json;

pub use json::{from_json, map_to_json, parse_json, to_json};
