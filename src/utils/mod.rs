pub mod endpoint;
pub use endpoint::{EndpointValidationError, validate_endpoint};
pub mod format;
pub use format::{format_date, format_hms, format_time, format_timestamp, truncate_chars};
