pub mod input;
pub mod status;

pub use input::{spawn_ctrl_c_listener, spawn_stdin_listener};
pub use status::{render_status_line, run_status_display};
