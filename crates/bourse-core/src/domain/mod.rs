//! Domain types shared by the parser, the mapper and the batch driver.

mod deadline;
mod row;
mod source;
mod window;

pub use deadline::Deadline;
pub use row::CanonicalRow;
pub use source::Source;
pub use window::DateWindow;
