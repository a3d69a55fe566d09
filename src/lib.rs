// Library module for recup-cleaner
// Re-exports modules for use in integration tests and the binary

pub mod cleaner;
pub mod fs;
pub mod ui;
