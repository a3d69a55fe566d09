pub mod mover;

pub use mover::{move_file, prune_empty_dirs};
