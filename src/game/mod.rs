pub mod chart;
pub mod events;
pub mod line;
pub mod math;
pub mod note;
pub mod parsing;
pub mod timing;
