pub mod constants;
pub mod decimal;
pub mod ids;
pub mod progress;

pub use constants::*;
pub use decimal::{exact_decimal, format_reading};
pub use ids::{IdGenerator, UuidGenerator};
pub use progress::ProgressReporter;
