pub mod monitor;
pub mod produce;
pub mod serve;
pub mod view;

use tokio::sync::watch;

/// Single-threaded runtime for one viewer or server. Exits the process if the
/// runtime cannot be built.
pub fn runtime() -> tokio::runtime::Runtime {
    match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {e}");
            std::process::exit(1);
        }
    }
}

/// Cancel signal raised by Ctrl+C.
pub fn ctrlc_signal() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = tx.send(true);
    }) {
        log::warn!("could not install Ctrl+C handler: {e}");
    }
    rx
}
