pub fn run(url: &str, rows: usize) {
    if let Err(e) = crate::tui::app::run(url, rows) {
        eprintln!("TUI error: {e}");
        std::process::exit(1);
    }
}
