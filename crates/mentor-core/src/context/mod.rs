mod instruction;
pub mod catalog;

pub use instruction::{InstructionBuilder, Mode};
pub use catalog::{find_course, find_law, law_prompt, Course, COURSES, LAWS};
