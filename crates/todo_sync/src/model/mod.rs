mod task;

pub use task::{Task, parse_duration};
