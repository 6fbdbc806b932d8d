use std::panic;

use log::error;

/// Install panic hooks for the `pdfcanvas` binary.
///
/// Debug builds get `better_panic` backtraces; release builds get the
/// `human_panic` crash report. Either way the panic also lands in the log.
pub fn initialize_panic_handler() {
    if cfg!(debug_assertions) {
        better_panic::install();
    } else {
        human_panic::setup_panic!();
    }

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        error!("Panic: {panic_info}");
        default_hook(panic_info);
    }));
}
