pub mod ids;
pub mod logging;
pub mod time;

pub use ids::validate_identifier_value;
pub use time::now_iso8601;
