//! Device adapters for the reader loop.

mod line_reader;
mod relay;

pub use line_reader::LineCardReader;
pub use relay::{LoggingActuator, RelayActuator};
