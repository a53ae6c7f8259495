//! Stream-to-frame data path: lines, schema, records, window and planner.

pub mod lines;
pub mod planner;
pub mod record;
pub mod schema;
pub mod window;
