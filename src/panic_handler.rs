use crossterm::{
    execute,
    terminal::{LeaveAlternateScreen, disable_raw_mode},
};
use std::io::{self, Write};
use std::panic;

/// Install the panic hook.
///
/// A panic on the UI thread restores the terminal and exits. A panic on a
/// load worker only gets reported: the worker's channel closes and the host
/// sees the load fail like any other.
pub fn initialize_panic_handler() {
    #[cfg(debug_assertions)]
    better_panic::install();

    #[cfg(not(debug_assertions))]
    human_panic::setup_panic!();

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let on_main_thread = std::thread::current().name() == Some("main");
        if !on_main_thread {
            log::error!("Load worker panicked: {panic_info}");
            return;
        }

        restore_terminal();
        default_hook(panic_info);
        std::process::exit(1);
    }));
}

/// Restore terminal to a clean state
///
/// Disables raw mode, leaves the alternate screen and shows the cursor.
pub fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
    let _ = execute!(io::stderr(), crossterm::cursor::Show);
    let _ = writeln!(io::stderr());
}
