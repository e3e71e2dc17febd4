//! Waterfall WebAssembly viewer — the graphical variant in the browser.
//!
//! The page (see `web/waterfall/index.html`) provides a `<canvas id="chart">`
//! and optional `#status`, `#wsUrl`, `#rows` and `#bins` elements. Creating a
//! [`WaterfallViewer`] reads `?ws=` and `?rows=` from the page URL, connects,
//! and keeps reconnecting every 500 ms until [`WaterfallViewer::stop`].
//!
//! The connection policy lives in `waterfall_core::StreamClient`; this crate
//! only feeds it browser events:
//!
//! 1. **WebSocket** — `open` / `message` / `error` / `close` callbacks
//! 2. **setTimeout** — reconnect timers, revoked with `clearTimeout`
//! 3. **Canvas** — each frame repaints the whole heatmap

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use wasm_bindgen::prelude::*;
use web_sys::{
    CanvasRenderingContext2d, CloseEvent, Document, Element, Event, HtmlCanvasElement,
    MessageEvent, WebSocket,
};

use waterfall_core::{
    BinFrame, Directive, FrameSink, MatrixGrid, ReconnectPolicy, Scheduler, Status, StreamClient,
    TimerId, ViewerConfig, WaterfallSession,
};

const BACKGROUND: &str = "#000";

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}

// ---------------------------------------------------------------------------
// Canvas geometry
// ---------------------------------------------------------------------------

/// Pixel rectangle `(x, y, w, h)` of grid cell `(col, row)` on a canvas.
///
/// Row 0 is the oldest row and sits at the bottom edge, so a full history
/// shows the newest row on top.
fn cell_rect(
    grid: (usize, usize),
    canvas: (f64, f64),
    col: usize,
    row: usize,
) -> (f64, f64, f64, f64) {
    let (cols, rows) = grid;
    let (width, height) = canvas;
    let w = width / cols.max(1) as f64;
    let h = height / rows.max(1) as f64;
    let top = rows.saturating_sub(row + 1) as f64 * h;
    (col as f64 * w, top, w, h)
}

// ---------------------------------------------------------------------------
// Canvas sink
// ---------------------------------------------------------------------------

/// Page elements the viewer writes to. Only the canvas is required.
struct Page {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    status: Option<Element>,
    bins: Option<Element>,
}

impl Page {
    fn find(document: &Document, canvas_id: &str) -> Result<Self, JsValue> {
        let canvas = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| JsValue::from_str(&format!("no element #{canvas_id}")))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| JsValue::from_str(&format!("#{canvas_id} is not a canvas")))?;
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        Ok(Self {
            canvas,
            ctx,
            status: document.get_element_by_id("status"),
            bins: document.get_element_by_id("bins"),
        })
    }

    /// Match the drawing buffer to the displayed size so cells stay sharp.
    fn fit_canvas(&self) -> (f64, f64) {
        let (w, h) = (self.canvas.client_width(), self.canvas.client_height());
        if w > 0 && h > 0 {
            if self.canvas.width() != w as u32 {
                self.canvas.set_width(w as u32);
            }
            if self.canvas.height() != h as u32 {
                self.canvas.set_height(h as u32);
            }
        }
        (f64::from(self.canvas.width()), f64::from(self.canvas.height()))
    }

    fn paint(&self, grid: &MatrixGrid) {
        let size = self.fit_canvas();
        self.ctx.set_fill_style_str(BACKGROUND);
        self.ctx.fill_rect(0.0, 0.0, size.0, size.1);

        let dims = (grid.width(), grid.height());
        for y in 0..grid.height() {
            for (x, cell) in grid.row(y).iter().enumerate() {
                // Rows not filled yet stay background.
                let Some(rgb) = cell else { continue };
                let (px, py, w, h) = cell_rect(dims, size, x, y);
                self.ctx.set_fill_style_str(&rgb.to_string());
                // Half a pixel of overlap hides seams between cells.
                self.ctx.fill_rect(px, py, w + 0.5, h + 0.5);
            }
        }
    }
}

/// Sink that folds frames into a session and repaints the canvas.
struct CanvasSink {
    session: WaterfallSession,
    page: Page,
}

impl FrameSink for CanvasSink {
    fn accept(&mut self, frame: &BinFrame) {
        if self.session.ingest(frame)
            && let Some(el) = &self.page.bins
        {
            el.set_text_content(Some(&self.session.bins().to_string()));
        }
        let grid = self.session.render();
        self.page.paint(&grid);
    }

    fn status(&mut self, status: &Status) {
        if let Some(el) = &self.page.status {
            el.set_text_content(Some(&status.to_string()));
        }
    }
}

// ---------------------------------------------------------------------------
// setTimeout scheduler
// ---------------------------------------------------------------------------

/// Timers backed by `window.setTimeout`. A fired timer reports back to the
/// driver through a weak handle, so a dropped viewer ignores it.
struct TimeoutScheduler {
    driver: Weak<RefCell<Driver>>,
    next_id: u64,
    handles: Vec<(TimerId, i32)>,
}

impl TimeoutScheduler {
    fn new(driver: Weak<RefCell<Driver>>) -> Self {
        Self {
            driver,
            next_id: 0,
            handles: Vec::new(),
        }
    }

    fn forget(&mut self, id: TimerId) {
        self.handles.retain(|(t, _)| *t != id);
    }
}

impl Scheduler for TimeoutScheduler {
    fn schedule(&mut self, delay: Duration) -> TimerId {
        self.next_id += 1;
        let id = TimerId::new(self.next_id);
        let driver = self.driver.clone();
        let cb = Closure::once_into_js(move || {
            if let Some(driver) = driver.upgrade() {
                Driver::on_timer(&driver, id);
            }
        });
        let ms = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
        let handle = web_sys::window().and_then(|win| {
            win.set_timeout_with_callback_and_timeout_and_arguments_0(cb.unchecked_ref(), ms)
                .ok()
        });
        match handle {
            Some(handle) => self.handles.push((id, handle)),
            None => log::error!("setTimeout unavailable; reconnect {} will never fire", id.raw()),
        }
        id
    }

    fn cancel(&mut self, id: TimerId) {
        if let Some(&(_, handle)) = self.handles.iter().find(|(t, _)| *t == id)
            && let Some(win) = web_sys::window()
        {
            win.clear_timeout_with_handle(handle);
        }
        self.forget(id);
    }
}

// ---------------------------------------------------------------------------
// WebSocket driver
// ---------------------------------------------------------------------------

/// An open socket and the callbacks bound to it.
struct Channel {
    socket: WebSocket,
    _on_open: Closure<dyn FnMut(Event)>,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_error: Closure<dyn FnMut(Event)>,
    _on_close: Closure<dyn FnMut(CloseEvent)>,
}

impl Channel {
    fn open(url: &str, driver: &Weak<RefCell<Driver>>) -> Result<Self, JsValue> {
        let socket = WebSocket::new(url)?;

        let d = driver.clone();
        let on_open = Closure::<dyn FnMut(Event)>::new(move |_: Event| {
            Driver::dispatch(&d, |client| client.on_open());
        });
        let d = driver.clone();
        let on_message = Closure::<dyn FnMut(MessageEvent)>::new(move |ev: MessageEvent| {
            // Binary payloads are not frames.
            let Some(text) = ev.data().as_string() else {
                return;
            };
            Driver::dispatch(&d, |client| client.on_message(&text));
        });
        let d = driver.clone();
        let on_error = Closure::<dyn FnMut(Event)>::new(move |_: Event| {
            Driver::dispatch(&d, |client| client.on_error("WebSocket error"));
        });
        let d = driver.clone();
        let on_close = Closure::<dyn FnMut(CloseEvent)>::new(move |_: CloseEvent| {
            if let Some(driver) = d.upgrade() {
                driver.borrow_mut().retire_channel();
            }
            Driver::dispatch(&d, |client| client.on_close());
        });

        socket.set_onopen(Some(on_open.as_ref().unchecked_ref()));
        socket.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
        socket.set_onerror(Some(on_error.as_ref().unchecked_ref()));
        socket.set_onclose(Some(on_close.as_ref().unchecked_ref()));

        Ok(Self {
            socket,
            _on_open: on_open,
            _on_message: on_message,
            _on_error: on_error,
            _on_close: on_close,
        })
    }

    /// Unhook the callbacks so a dead socket can never reach the client.
    fn detach(&self) {
        self.socket.set_onopen(None);
        self.socket.set_onmessage(None);
        self.socket.set_onerror(None);
        self.socket.set_onclose(None);
    }
}

type BrowserClient = StreamClient<CanvasSink, TimeoutScheduler>;

struct Driver {
    client: BrowserClient,
    channel: Option<Channel>,
    // Detached channels wait here until no callback of theirs is running.
    retired: Vec<Channel>,
    weak: Weak<RefCell<Driver>>,
}

impl Driver {
    fn retire_channel(&mut self) {
        if let Some(channel) = self.channel.take() {
            channel.detach();
            self.retired.push(channel);
        }
    }

    fn on_timer(this: &Rc<RefCell<Driver>>, id: TimerId) {
        let directive = {
            let mut driver = this.borrow_mut();
            // A timer callback runs outside every socket callback.
            driver.retired.clear();
            driver.client.scheduler_mut().forget(id);
            driver.client.on_timer(id)
        };
        Self::apply(this, directive);
    }

    /// Run one client handler, then carry out what it asks for.
    fn dispatch(
        weak: &Weak<RefCell<Driver>>,
        handler: impl FnOnce(&mut BrowserClient) -> Directive,
    ) {
        let Some(this) = weak.upgrade() else { return };
        let directive = handler(&mut this.borrow_mut().client);
        Self::apply(&this, directive);
    }

    fn apply(this: &Rc<RefCell<Driver>>, mut directive: Directive) {
        loop {
            let mut driver = this.borrow_mut();
            directive = match directive {
                Directive::Continue => return,
                Directive::Connect => {
                    let url = driver.client.url().to_string();
                    match Channel::open(&url, &driver.weak) {
                        Ok(channel) => {
                            driver.channel = Some(channel);
                            return;
                        }
                        Err(e) => {
                            let message = e.as_string().unwrap_or_else(|| format!("{e:?}"));
                            driver.client.on_error(&message)
                        }
                    }
                }
                Directive::CloseChannel => {
                    if let Some(channel) = &driver.channel {
                        let _ = channel.socket.close();
                    }
                    driver.retire_channel();
                    driver.client.on_close()
                }
                Directive::Exit(end) => {
                    log::info!("waterfall viewer stopped: {end}");
                    return;
                }
            };
        }
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        if let Some(channel) = self.channel.take() {
            channel.detach();
            let _ = channel.socket.close();
        }
    }
}

// ---------------------------------------------------------------------------
// Exported viewer
// ---------------------------------------------------------------------------

/// A running viewer bound to one canvas.
#[wasm_bindgen]
pub struct WaterfallViewer {
    driver: Rc<RefCell<Driver>>,
}

#[wasm_bindgen]
impl WaterfallViewer {
    /// Configure from the page query string and start connecting.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str) -> Result<WaterfallViewer, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let config = ViewerConfig::from_query(&window.location().search()?);

        if let Some(el) = document.get_element_by_id("wsUrl") {
            el.set_text_content(Some(&config.ws_url));
        }
        if let Some(el) = document.get_element_by_id("rows") {
            el.set_text_content(Some(&config.max_rows.to_string()));
        }

        let page = Page::find(&document, canvas_id)?;
        let mut session = WaterfallSession::new(config.max_rows);
        if let Some(el) = &page.bins {
            el.set_text_content(Some(&session.bins().to_string()));
        }
        page.paint(&session.render());

        let sink = CanvasSink { session, page };
        let driver = Rc::new_cyclic(|weak: &Weak<RefCell<Driver>>| {
            RefCell::new(Driver {
                client: StreamClient::new(
                    config.ws_url.clone(),
                    ReconnectPolicy::default(),
                    sink,
                    TimeoutScheduler::new(weak.clone()),
                ),
                channel: None,
                retired: Vec::new(),
                weak: weak.clone(),
            })
        });
        log::info!("waterfall viewer → {} ({} rows)", config.ws_url, config.max_rows);

        let directive = driver.borrow_mut().client.start();
        Driver::apply(&driver, directive);
        Ok(WaterfallViewer { driver })
    }

    /// Close the channel and revoke any pending reconnect.
    pub fn stop(&self) {
        let directive = self.driver.borrow_mut().client.shutdown();
        Driver::apply(&self.driver, directive);
    }

    /// `connecting`, `connected` or `disconnected`.
    pub fn state(&self) -> String {
        self.driver.borrow().client.state().to_string()
    }

    /// Frames rendered so far.
    pub fn frames(&self) -> f64 {
        self.driver.borrow().client.sink().session.frames() as f64
    }

    /// Rows currently held.
    pub fn rows(&self) -> usize {
        self.driver.borrow().client.sink().session.history().len()
    }
}
