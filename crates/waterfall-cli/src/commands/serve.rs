use waterfall_core::{DEFAULT_WS_URL, viewer_url};
use waterfall_server::VIEWER_PATH;

pub fn run(root: &str, host: &str, port: u16) {
    let page = format!("http://{host}:{port}{VIEWER_PATH}");

    println!("🌊 waterfall viewer server v{}", waterfall_core::VERSION);
    println!("   serving {root}");
    println!("   Viewer server: {}", viewer_url(&page, DEFAULT_WS_URL));
    println!();
    println!("   Query params:");
    println!("     ws=<url>     Channel to connect to (default: {DEFAULT_WS_URL})");
    println!("     rows=N       Rows of history (default: {})", waterfall_core::DEFAULT_MAX_ROWS);
    println!();

    let rt = super::runtime();
    if let Err(e) = rt.block_on(waterfall_server::run_server(root, host, port)) {
        eprintln!("Error: server on {host}:{port} failed: {e}");
        std::process::exit(1);
    }
}
