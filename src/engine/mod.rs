pub mod compensation;
pub mod deadline;
pub mod lifecycle;
pub mod matching;
pub mod sweeper;
