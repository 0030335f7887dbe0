//! The command-line host: wires up the app services, shows one inline image,
//! and prints what the item painted.

use std::{
    cell::RefCell,
    path::{Path, PathBuf},
    rc::Rc,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use anyhow::bail;
use bytesize::ByteSize;
use clap::Parser;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use ruma::{OwnedServerName, OwnedUserId, RoomId, matrix_uri::MatrixId};
use tracing_subscriber::EnvFilter;

use crate::{
    client_bridge::{ChatPage, ClientBridge, CreateRoomRequest, UserSettings},
    config::{Config, default_config_path, load_config, save_config},
    image_item::{ClickOutcome, ImageItem, ImageItemServices, MouseButton},
    image_overlay::{ImageOverlay, OverlayPresenter},
    link_opener::{MatrixUriHandler, PlatformOpener},
    media_client::{DownloadCallback, HttpMediaClient, MediaClient, RequestError},
    paint::{DisplayList, FixedWidthMetrics, Point, Size},
    save_prompt::{DialogSavePrompt, FixedSavePath, SavePathPrompt},
    signal::UiSignal,
    theme::ThemeKind,
};

/// The viewport size assumed when reporting how an overlay would be shown.
const OVERLAY_VIEWPORT: Size = Size::new(1920, 1080);

#[derive(Parser, Debug)]
#[clap(version, about)]
struct Cli {
    /// The `mxc://` URI or HTTP(S) URL of the image to show.
    #[clap(value_parser)]
    url: String,

    /// The caption shown for the image. Defaults to the last segment of the URL.
    #[clap(long)]
    caption: Option<String>,

    /// The size of the image file in bytes, if known.
    #[clap(long)]
    size: Option<u64>,

    /// The homeserver that `mxc://` URIs are resolved against.
    #[clap(long)]
    homeserver: Option<String>,

    #[clap(long)]
    port: Option<u16>,

    #[clap(long)]
    access_token: Option<String>,

    #[clap(long)]
    max_width: Option<u32>,

    #[clap(long)]
    max_height: Option<u32>,

    /// Paint the item as though the pointer were hovering over it.
    #[clap(long, action)]
    hover: bool,

    /// Simulate a left click at the given `X,Y` position once the image has loaded.
    #[clap(long, value_parser = parse_point)]
    click: Option<Point>,

    /// Save the original image to this path.
    #[clap(long)]
    save: Option<PathBuf>,

    /// Save the original image to a path chosen in the native "Save as" dialog.
    #[clap(long, action, conflicts_with = "save")]
    save_dialog: bool,

    /// One of "light", "dark", or "system".
    #[clap(long)]
    theme: Option<String>,

    /// The config file to use instead of the one in the app data directory.
    #[clap(long)]
    config: Option<PathBuf>,

    /// Write the config, including any overrides given on the command line, back to the config file.
    #[clap(long, action)]
    save_config: bool,

    /// How long to wait for downloads to complete, in seconds.
    #[clap(long, default_value_t = 30)]
    timeout: u64,

    /// Enable verbose logging output.
    #[clap(short, long, action)]
    verbose: bool,
}

impl Cli {
    /// Overrides config values with any that were given on the command line.
    fn apply_to(&self, config: &mut Config) {
        if let Some(homeserver) = &self.homeserver {
            config.homeserver = homeserver.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(access_token) = &self.access_token {
            config.access_token = Some(access_token.clone());
        }
        if let Some(max_width) = self.max_width {
            config.max_image_width = max_width;
        }
        if let Some(max_height) = self.max_height {
            config.max_image_height = max_height;
        }
        if let Some(theme) = &self.theme {
            config.theme = ThemeKind::from_name(theme).name().to_string();
        }
    }

    fn wants_save(&self) -> bool {
        self.save.is_some() || self.save_dialog
    }

    fn save_prompt(&self) -> RememberingSavePrompt {
        let inner: Box<dyn SavePathPrompt> = if self.save_dialog {
            Box::new(DialogSavePrompt)
        } else {
            Box::new(FixedSavePath(self.save.clone()))
        };
        RememberingSavePrompt { inner, chosen: RefCell::new(None) }
    }
}

/// Remembers the path most recently chosen through the wrapped prompt,
/// so that the host can report where the image was saved.
struct RememberingSavePrompt {
    inner: Box<dyn SavePathPrompt>,
    chosen: RefCell<Option<PathBuf>>,
}

impl SavePathPrompt for RememberingSavePrompt {
    fn choose_save_path(&self, title: &str, suggested_name: &str) -> Option<PathBuf> {
        let path = self.inner.choose_save_path(title, suggested_name);
        self.chosen.replace(path.clone());
        path
    }
}

fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s.split_once(',').ok_or_else(|| format!("expected X,Y but got {s:?}"))?;
    let x = x.trim().parse::<f64>().map_err(|e| format!("invalid X coordinate: {e}"))?;
    let y = y.trim().parse::<f64>().map_err(|e| format!("invalid Y coordinate: {e}"))?;
    Ok(Point::new(x, y))
}

/// Returns the last non-empty path segment of `url`, or the whole URL if there is none.
fn caption_from_url(url: &str) -> String {
    url.rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or(url)
        .to_string()
}

fn init_logging(verbose: bool) {
    let default_directives = if verbose {
        "warn,net=debug,ui=debug,inline_image=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}


/// Wraps a [`MediaClient`] to keep track of how many downloads are still in flight,
/// waking up the UI loop whenever one of them completes (successfully or not).
struct TrackedMediaClient {
    inner: Arc<dyn MediaClient>,
    in_flight: Arc<AtomicUsize>,
    signal: UiSignal,
}

impl MediaClient for TrackedMediaClient {
    fn download(&self, url: &str, on_fetched: DownloadCallback) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
            signal: self.signal.clone(),
        };
        self.inner.download(url, Box::new(move |result: Result<Vec<u8>, RequestError>| {
            let _guard = guard;
            on_fetched(result);
        }));
    }
}

/// Marks one download as finished when dropped.
///
/// This also happens if the completion callback panics or is dropped without being called.
struct InFlightGuard {
    in_flight: Arc<AtomicUsize>,
    signal: UiSignal,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.signal.set_ui_signal();
    }
}

/// A chat page that has no rooms or session of its own and just reports what it was asked to do.
struct ConsoleChatPage;

impl MatrixUriHandler for ConsoleChatPage {
    fn handle_matrix_link(&self, id: &MatrixId, _via: &[OwnedServerName]) -> bool {
        tracing::info!(target: "ui", "No in-app view for Matrix link to {id:?}");
        false
    }
}

impl ChatPage for ConsoleChatPage {
    fn set_status(&self, message: &str) {
        tracing::info!(target: "ui", "Status set to {message:?}");
    }
    fn show_user_settings_page(&self) {
        tracing::info!(target: "ui", "Showing user settings page");
    }
    fn initiate_logout(&self) {
        tracing::info!(target: "ui", "Logging out");
    }
    fn create_room(&self, request: CreateRoomRequest) {
        tracing::info!(target: "ui", "Creating room: {request:?}");
    }
    fn join_room(&self, room_id_or_alias: &str) {
        tracing::info!(target: "ui", "Joining room {room_id_or_alias}");
    }
    fn add_room_to_space(&self, room_id: &RoomId, space_id: &RoomId) {
        tracing::info!(target: "ui", "Adding room {room_id} to space {space_id}");
    }
    fn remove_room_from_space(&self, room_id: &RoomId, space_id: &RoomId) {
        tracing::info!(target: "ui", "Removing room {room_id} from space {space_id}");
    }
    fn is_cache_initialized(&self) -> bool {
        false
    }
    fn local_user(&self) -> Option<OwnedUserId> {
        None
    }
}

/// Keeps the most recently shown overlay so that the user can save from it.
#[derive(Default)]
struct ConsoleOverlays {
    current: RefCell<Option<ImageOverlay>>,
}

impl OverlayPresenter for ConsoleOverlays {
    fn show(&self, overlay: ImageOverlay) {
        let shown_at = overlay.display_size(OVERLAY_VIEWPORT);
        println!(
            "Opened overlay for {}x{} image, shown at {}x{}",
            overlay.image().width(), overlay.image().height(),
            shown_at.width, shown_at.height,
        );
        *self.current.borrow_mut() = Some(overlay);
    }
}


/// Runs the UI loop until no downloads are in flight or the deadline passes,
/// applying delivered updates to the item as they arrive.
fn run_until_idle(
    item: &mut ImageItem,
    signal_receiver: &Receiver<()>,
    in_flight: &AtomicUsize,
    deadline: Instant,
) -> anyhow::Result<()> {
    loop {
        item.process_updates();
        if in_flight.load(Ordering::SeqCst) == 0 {
            // Apply anything delivered by the last completed download.
            item.process_updates();
            return Ok(());
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        match signal_receiver.recv_timeout(remaining) {
            Ok(()) => { }
            Err(RecvTimeoutError::Timeout) => bail!("Timed out waiting for downloads to complete"),
            Err(RecvTimeoutError::Disconnected) => bail!("BUG: UI signal sender was dropped"),
        }
    }
}

fn print_display_list(item: &mut ImageItem) {
    let mut display_list = DisplayList::new();
    item.paint(&mut display_list);
    let size = item.preferred_size();
    println!("Preferred size: {}x{}", size.width, size.height);
    for command in &display_list.commands {
        println!("  {command}");
    }
}

pub fn app_main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config.clone().or_else(default_config_path);
    let mut config = match &config_path {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    cli.apply_to(&mut config);
    if cli.save_config {
        persist_config(&config, config_path.as_deref())?;
    }

    let (signal, signal_receiver) = UiSignal::new();
    let in_flight = Arc::new(AtomicUsize::new(0));
    let client = TrackedMediaClient {
        inner: Arc::new(HttpMediaClient::start(config.media_client_settings())?),
        in_flight: Arc::clone(&in_flight),
        signal: signal.clone(),
    };

    let settings = Rc::new(RefCell::new(UserSettings::new(config.theme.clone())));
    let bridge = ClientBridge::new(
        Rc::new(ConsoleChatPage),
        settings,
        Rc::new(PlatformOpener),
        config.tooltip_delay(),
    );
    let overlays = Rc::new(ConsoleOverlays::default());
    let save_prompt = Rc::new(cli.save_prompt());
    let services = ImageItemServices {
        client: Arc::new(client),
        links: bridge.link_opener().clone(),
        overlays: overlays.clone(),
        save_prompt: save_prompt.clone(),
        metrics: Rc::new(FixedWidthMetrics::default()),
        signal,
    };

    let caption = cli.caption.clone().unwrap_or_else(|| caption_from_url(&cli.url));
    match cli.size {
        Some(size) => println!("Showing {caption} ({})", ByteSize::b(size)),
        None => println!("Showing {caption}"),
    }
    let mut item = ImageItem::new(&cli.url, caption, cli.size, config.image_item_config(), services);
    let deadline = Instant::now() + Duration::from_secs(cli.timeout);
    run_until_idle(&mut item, &signal_receiver, &in_flight, deadline)?;

    if !item.is_loaded() {
        println!("The image could not be loaded; showing its caption instead.");
    }
    item.set_hovered(cli.hover);
    print_display_list(&mut item);

    let mut overlay_opened = false;
    if let Some(position) = cli.click {
        let outcome = item.on_click(MouseButton::Left, position);
        println!("Click at ({}, {}): {outcome:?}", position.x, position.y);
        overlay_opened = outcome == ClickOutcome::OpenedOverlay;
    }

    if cli.wants_save() {
        if overlay_opened && let Some(overlay) = overlays.current.borrow().as_ref() {
            overlay.request_save();
        } else {
            item.save_as();
        }
        run_until_idle(&mut item, &signal_receiver, &in_flight, deadline)?;
        match save_prompt.chosen.borrow().as_deref() {
            Some(path) if path.exists() => println!("Saved image to {}", path.display()),
            Some(path) => println!("The image could not be saved to {}", path.display()),
            None => println!("Saving was cancelled."),
        }
    }
    Ok(())
}

fn persist_config(config: &Config, path: Option<&Path>) -> anyhow::Result<()> {
    let Some(path) = path else {
        bail!("No config file path is available to save the config to");
    };
    save_config(config, path)?;
    tracing::info!("Saved config to {path:?}");
    Ok(())
}
