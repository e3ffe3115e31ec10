mod group;
mod task;

pub use group::Group;
pub use task::{Frequency, Priority, Task};
