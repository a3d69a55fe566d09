//! Cancellation listeners.
//!
//! The user finishes a run by typing `y` + Enter once the recovery tool is
//! done, or with Ctrl-C. Either one flips a watch flag that the scheduler
//! reads between cycles.

use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::Arc;
use std::thread;

use crossterm::{
    cursor::MoveUp,
    execute,
    terminal::{Clear, ClearType},
};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Whether a line of input asks to finish.
pub fn is_finish_command(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "y" | "yes" | "q" | "quit")
}

/// Watch stdin on a plain thread; blocking reads never touch the runtime.
///
/// End of input stops the listener without cancelling.
pub fn spawn_stdin_listener(cancel: Arc<watch::Sender<bool>>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let interactive = io::stdin().is_terminal();
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if is_finish_command(&line) {
                if interactive {
                    erase_echoed_line();
                }
                debug!("finish requested from stdin");
                cancel.send_replace(true);
                break;
            }
        }
    })
}

/// First Ctrl-C finishes gracefully; a second one exits immediately.
pub fn spawn_ctrl_c_listener(cancel: Arc<watch::Sender<bool>>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            warn!("could not install Ctrl-C handler");
            return;
        }
        cancel.send_replace(true);

        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted twice, exiting without final pass");
            std::process::exit(130);
        }
    })
}

fn erase_echoed_line() {
    let mut stderr = io::stderr();
    let _ = execute!(stderr, MoveUp(1), Clear(ClearType::CurrentLine));
    let _ = stderr.flush();
}
