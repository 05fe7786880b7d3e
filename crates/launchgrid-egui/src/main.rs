use launchgrid_core::{icons, render, shared, store};

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, mpsc};

use anyhow::Context as _;
use fs2::FileExt;
use log::LevelFilter;
use tokio::runtime::Runtime;

struct TeeLogger {
    stderr: env_logger::Logger,
    file: Option<Mutex<std::fs::File>>,
}

impl log::Log for TeeLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        self.stderr.enabled(metadata)
    }

    fn log(&self, record: &log::Record<'_>) {
        self.stderr.log(record);
        let Some(file) = self.file.as_ref() else {
            return;
        };
        // Best-effort: never let logging failures affect app runtime.
        let mut file = file.lock().unwrap_or_else(|p| p.into_inner());
        let _ = writeln!(
            file,
            "{:?} {:<5} {} - {}",
            std::time::SystemTime::now(),
            record.level(),
            record.target(),
            record.args()
        );
        let _ = file.flush();
    }

    fn flush(&self) {
        self.stderr.flush();
        if let Some(file) = self.file.as_ref() {
            let mut file = file.lock().unwrap_or_else(|p| p.into_inner());
            let _ = file.flush();
        }
    }
}

fn init_logging() {
    // Still respects RUST_LOG, and always writes a persistent log file for
    // GUI launches where stdout/stderr is invisible.
    //
    // NOTE: must run after `shared::init_paths()` so `shared::log_dir()` is
    // available.
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if std::env::var("RUST_LOG").is_err() {
        builder.filter_level(LevelFilter::Info);
    }
    let stderr_logger = builder.build();

    let file = {
        let dir = shared::log_dir();
        let _ = std::fs::create_dir_all(&dir);
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("launchgrid.log"))
            .ok()
    };

    let max_level = stderr_logger.filter();
    let logger = TeeLogger {
        stderr: stderr_logger,
        file: file.map(Mutex::new),
    };
    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(max_level);
    }
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let widget_mode = args.iter().any(|a| a == "--widget");
    let out_path = args
        .iter()
        .position(|a| a == "--out")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from);

    shared::init_paths(shared::discover_paths()?);
    init_logging();
    log::info!(
        "{} starting (pid={}, args={:?})",
        shared::PRODUCT_NAME,
        std::process::id(),
        args
    );
    log::info!("config_dir={}", shared::config_dir().display());
    log::info!("data_dir={}", shared::data_dir().display());

    std::fs::create_dir_all(shared::config_dir())?;
    icons::ensure_placeholder_icon();

    if widget_mode {
        run_widget(out_path)
    } else {
        run_interactive()
    }
}

/// Passive branch: render the grid from persisted state and write it as a
/// PNG. Read-only, no lock, no window.
fn run_widget(out_path: Option<PathBuf>) -> anyhow::Result<()> {
    let store = store::ShortcutStore::open()?;
    let runtime = Runtime::new()?;

    let style = render::detect_background();
    let canvas = runtime.block_on(render::render_widget(
        store.shortcuts(),
        &render::GridLayout::default(),
        style,
    ));

    let path = out_path.unwrap_or_else(|| shared::data_dir().join("widget.png"));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    canvas
        .image
        .save_with_format(&path, image::ImageFormat::Png)
        .with_context(|| format!("failed to write widget image {}", path.display()))?;
    log::info!(
        "Wrote widget image ({} cells) to {}",
        canvas.cells.len(),
        path.display()
    );
    Ok(())
}

fn run_interactive() -> anyhow::Result<()> {
    // Single instance: the settings file has exactly one writer.
    let lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(shared::config_dir().join("launchgrid.lock"))?;
    if lock_file.try_lock_exclusive().is_err() {
        log::warn!(
            "{} is already running (lockfile held); exiting",
            shared::PRODUCT_NAME
        );
        return Ok(());
    }

    let runtime = Arc::new(
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("launchgrid-core")
            .build()?,
    );
    let store = store::ShortcutStore::open()?;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([560.0, 640.0]),
        ..Default::default()
    };
    eframe::run_native(
        shared::PRODUCT_NAME,
        native_options,
        Box::new(move |cc| Ok(Box::new(LaunchGridApp::new(cc, runtime, store, lock_file)))),
    )
    .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    Ok(())
}

/// Icon state for a settings-list row, keyed by the raw icon reference.
enum RowIcon {
    Loading,
    Ready(egui::TextureHandle),
}

struct EditDialog {
    index: usize,
    url_input: String,
    icon_input: String,
}

enum DialogOutcome {
    PickIcon,
    Save,
    Cancel,
}

enum RowAction {
    Edit(usize),
    Delete(usize),
    Add,
    Preview,
}

struct PreviewWindow {
    texture: egui::TextureHandle,
    size: egui::Vec2,
    cells: Vec<render::CellRegion>,
}

struct LaunchGridApp {
    runtime: Arc<Runtime>,
    store: store::ShortcutStore,

    // Keep the lock file alive for the lifetime of the app.
    #[allow(dead_code)]
    _lock_file: std::fs::File,

    // List-view icons use the substitute fallback policy, so every fetch
    // resolves to *some* image; rows show a spinner until then.
    row_icons: HashMap<String, RowIcon>,
    icon_tx: mpsc::Sender<(String, image::RgbaImage)>,
    icon_rx: mpsc::Receiver<(String, image::RgbaImage)>,

    edit: Option<EditDialog>,

    // Non-blocking file picking (run dialogs off the UI thread).
    pending_photo_pick: Option<(mpsc::Receiver<Option<PathBuf>>, usize)>,
    pending_background_pick: Option<mpsc::Receiver<Option<PathBuf>>>,

    preview: Option<PreviewWindow>,
    preview_rx: Option<mpsc::Receiver<render::WidgetCanvas>>,

    last_error: Option<String>,
}

impl LaunchGridApp {
    fn new(
        _cc: &eframe::CreationContext<'_>,
        runtime: Arc<Runtime>,
        store: store::ShortcutStore,
        lock_file: std::fs::File,
    ) -> Self {
        let (icon_tx, icon_rx) = mpsc::channel();
        Self {
            runtime,
            store,
            _lock_file: lock_file,
            row_icons: HashMap::new(),
            icon_tx,
            icon_rx,
            edit: None,
            pending_photo_pick: None,
            pending_background_pick: None,
            preview: None,
            preview_rx: None,
            last_error: None,
        }
    }

    fn report(&mut self, what: &str, err: anyhow::Error) {
        log::warn!("Failed to {what}: {err:#}");
        self.last_error = Some(format!("Failed to {what}: {err:#}"));
    }

    /// Resolve the texture for a list row, starting a fetch on first sight.
    fn row_icon_texture(&mut self, ctx: &egui::Context, raw: &str) -> Option<egui::TextureHandle> {
        match self.row_icons.get(raw) {
            Some(RowIcon::Ready(tex)) => return Some(tex.clone()),
            Some(RowIcon::Loading) => return None,
            None => {}
        }
        self.row_icons.insert(raw.to_owned(), RowIcon::Loading);

        let key = raw.to_owned();
        let tx = self.icon_tx.clone();
        let repaint = ctx.clone();
        self.runtime.spawn(async move {
            let img = icons::load_or_placeholder(&key).await.to_rgba8();
            let _ = tx.send((key, img));
            repaint.request_repaint();
        });
        None
    }

    fn drain_icon_results(&mut self, ctx: &egui::Context) {
        while let Ok((key, img)) = self.icon_rx.try_recv() {
            let size = [img.width() as usize, img.height() as usize];
            let color = egui::ColorImage::from_rgba_unmultiplied(size, img.as_raw());
            let texture = ctx.load_texture(format!("icon:{key}"), color, egui::TextureOptions::LINEAR);
            self.row_icons.insert(key, RowIcon::Ready(texture));
        }
    }

    fn poll_photo_pick(&mut self) {
        let Some((rx, index)) = self.pending_photo_pick.take() else {
            return;
        };
        match rx.try_recv() {
            Err(mpsc::TryRecvError::Empty) => self.pending_photo_pick = Some((rx, index)),
            // Picker cancelled: a no-op, back to the list as-is.
            Ok(None) | Err(mpsc::TryRecvError::Disconnected) => {}
            Ok(Some(path)) => {
                let imported = icons::import_icon(&path).and_then(|icon_url| {
                    self.store.set_icon(index, &icon_url)?;
                    Ok(icon_url)
                });
                match imported {
                    Ok(icon_url) => {
                        log::info!("Imported icon for shortcut {index}: {icon_url}");
                        self.preview = None;
                    }
                    Err(err) => self.report("import icon", err),
                }
            }
        }
    }

    fn poll_background_pick(&mut self) {
        let Some(rx) = self.pending_background_pick.take() else {
            return;
        };
        match rx.try_recv() {
            Err(mpsc::TryRecvError::Empty) => self.pending_background_pick = Some(rx),
            Ok(None) | Err(mpsc::TryRecvError::Disconnected) => {}
            Ok(Some(path)) => {
                match render::store_background(&path) {
                    Ok(()) => self.preview = None,
                    Err(err) => self.report("set background image", err),
                }
            }
        }
    }

    fn poll_preview(&mut self, ctx: &egui::Context) {
        let Some(rx) = self.preview_rx.take() else {
            return;
        };
        match rx.try_recv() {
            Err(mpsc::TryRecvError::Empty) => self.preview_rx = Some(rx),
            Err(mpsc::TryRecvError::Disconnected) => {}
            Ok(canvas) => {
                let size = [canvas.image.width() as usize, canvas.image.height() as usize];
                let color = egui::ColorImage::from_rgba_unmultiplied(size, canvas.image.as_raw());
                let texture =
                    ctx.load_texture("widget-preview", color, egui::TextureOptions::NEAREST);
                self.preview = Some(PreviewWindow {
                    texture,
                    size: egui::vec2(size[0] as f32, size[1] as f32),
                    cells: canvas.cells,
                });
            }
        }
    }

    /// Build the grid from current state and show it. Nothing is persisted.
    fn request_preview(&mut self, ctx: &egui::Context) {
        if self.preview_rx.is_some() {
            return;
        }
        let shortcuts = self.store.shortcuts().to_vec();
        let (tx, rx) = mpsc::channel();
        let repaint = ctx.clone();
        self.runtime.spawn(async move {
            let style = render::detect_background();
            let canvas =
                render::render_widget(&shortcuts, &render::GridLayout::default(), style).await;
            let _ = tx.send(canvas);
            repaint.request_repaint();
        });
        self.preview_rx = Some(rx);
    }

    fn pick_file_off_thread() -> mpsc::Receiver<Option<PathBuf>> {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let picked = rfd::FileDialog::new()
                .add_filter("Image", &["png", "jpg", "jpeg", "gif", "webp", "bmp"])
                .pick_file();
            let _ = tx.send(picked);
        });
        rx
    }

    fn draw_background_row(&mut self, ui: &mut egui::Ui) {
        let has_stored = render::background_path().is_file();
        ui.horizontal(|ui| {
            ui.label("Widget background:");
            ui.label(
                egui::RichText::new(if has_stored {
                    "custom image"
                } else {
                    "generated gradient"
                })
                .weak(),
            );
            if ui.button("Choose image…").clicked() && self.pending_background_pick.is_none() {
                self.pending_background_pick = Some(Self::pick_file_off_thread());
            }
            if has_stored && ui.button("Use gradient").clicked() {
                if let Err(err) = render::clear_background() {
                    self.report("clear background image", err);
                }
                self.preview = None;
            }
        });
    }

    fn draw_list(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading(shared::PRODUCT_NAME);
            ui.add_space(4.0);
            self.draw_background_row(ui);
            ui.separator();

            let rows: Vec<(usize, String, String)> = self
                .store
                .shortcuts()
                .iter()
                .enumerate()
                .map(|(i, s)| (i, s.url.clone(), s.icon_url.clone()))
                .collect();

            let mut action: Option<RowAction> = None;
            let list_height = (ui.available_height() - 72.0).max(60.0);
            egui::ScrollArea::vertical()
                .auto_shrink([false, true])
                .max_height(list_height)
                .show(ui, |ui| {
                    if rows.is_empty() {
                        ui.label(egui::RichText::new("No shortcuts yet.").weak().italics());
                    }
                    for (index, url, icon_url) in &rows {
                        ui.horizontal(|ui| {
                            match self.row_icon_texture(ctx, icon_url) {
                                Some(tex) => {
                                    ui.add(egui::Image::new((
                                        tex.id(),
                                        egui::vec2(28.0, 28.0),
                                    )));
                                }
                                None => {
                                    ui.add_sized([28.0, 28.0], egui::Spinner::new());
                                }
                            }
                            ui.with_layout(
                                egui::Layout::right_to_left(egui::Align::Center),
                                |ui| {
                                    if ui.button("Delete").clicked() {
                                        action = Some(RowAction::Delete(*index));
                                    }
                                    if ui.button("Edit").clicked() {
                                        action = Some(RowAction::Edit(*index));
                                    }
                                    let label = if url.trim().is_empty() {
                                        egui::RichText::new(shared::UNSET_URL_LABEL)
                                            .weak()
                                            .italics()
                                    } else {
                                        egui::RichText::new(url.as_str())
                                    };
                                    ui.with_layout(
                                        egui::Layout::left_to_right(egui::Align::Center),
                                        |ui| {
                                            ui.label(label);
                                        },
                                    );
                                },
                            );
                        });
                        ui.add_space(2.0);
                    }
                });

            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("Add new link").clicked() {
                    action = Some(RowAction::Add);
                }
                if ui.button("Preview").clicked() {
                    action = Some(RowAction::Preview);
                }
            });
            if let Some(err) = self.last_error.clone() {
                ui.label(
                    egui::RichText::new(err)
                        .color(ui.visuals().error_fg_color)
                        .small(),
                );
            }

            if let Some(action) = action {
                self.apply_row_action(ctx, action);
            }
        });
    }

    fn apply_row_action(&mut self, ctx: &egui::Context, action: RowAction) {
        match action {
            RowAction::Edit(index) => {
                if let Some(shortcut) = self.store.shortcuts().get(index) {
                    self.edit = Some(EditDialog {
                        index,
                        url_input: shortcut.url.clone(),
                        icon_input: shortcut.icon_url.clone(),
                    });
                }
            }
            RowAction::Delete(index) => {
                if let Err(err) = self.store.remove(index) {
                    self.report("delete shortcut", err);
                }
                self.preview = None;
            }
            RowAction::Add => match self.store.add() {
                Ok(index) => {
                    // New shortcuts go straight to the edit dialog, like the
                    // row's own Edit button would.
                    self.edit = Some(EditDialog {
                        index,
                        url_input: String::new(),
                        icon_input: String::new(),
                    });
                    self.preview = None;
                }
                Err(err) => self.report("add shortcut", err),
            },
            RowAction::Preview => self.request_preview(ctx),
        }
    }

    fn draw_edit_dialog(&mut self, ctx: &egui::Context) {
        let Some(mut dialog) = self.edit.take() else {
            return;
        };
        let picker_busy = self.pending_photo_pick.is_some();
        let mut outcome: Option<DialogOutcome> = None;

        egui::Window::new(format!("Edit link {}", dialog.index + 1))
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.label("Link URL");
                ui.text_edit_singleline(&mut dialog.url_input);
                ui.label("Icon URL");
                ui.text_edit_singleline(&mut dialog.icon_input);
                ui.separator();
                ui.horizontal(|ui| {
                    if ui
                        .add_enabled(!picker_busy, egui::Button::new("Pick icon from photos…"))
                        .clicked()
                    {
                        outcome = Some(DialogOutcome::PickIcon);
                    }
                    if ui.button("Save").clicked() {
                        outcome = Some(DialogOutcome::Save);
                    }
                    if ui.button("Cancel").clicked() {
                        outcome = Some(DialogOutcome::Cancel);
                    }
                });
            });

        match outcome {
            // Still open next frame.
            None => self.edit = Some(dialog),
            // Discard any interaction, no persistence.
            Some(DialogOutcome::Cancel) => {}
            Some(DialogOutcome::Save) => {
                if let Err(err) =
                    self.store
                        .update(dialog.index, &dialog.url_input, &dialog.icon_input)
                {
                    self.report("save shortcut", err);
                }
                self.preview = None;
            }
            // The dialog closes now; the import lands via poll_photo_pick,
            // leaving the typed URL field untouched.
            Some(DialogOutcome::PickIcon) => {
                self.pending_photo_pick = Some((Self::pick_file_off_thread(), dialog.index));
            }
        }
    }

    fn draw_preview(&mut self, ctx: &egui::Context) {
        let Some(preview) = self.preview.as_ref() else {
            return;
        };
        let mut open_flag = true;
        let mut launch: Option<String> = None;

        egui::Window::new("Widget preview")
            .open(&mut open_flag)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                let resp = ui.add(
                    egui::Image::new((preview.texture.id(), preview.size))
                        .sense(egui::Sense::click()),
                );
                if resp.clicked()
                    && let Some(pos) = resp.interact_pointer_pos()
                {
                    let rel = pos - resp.rect.min;
                    if rel.x >= 0.0 && rel.y >= 0.0 {
                        let (px, py) = (rel.x as u32, rel.y as u32);
                        if let Some(cell) = preview.cells.iter().find(|c| c.contains(px, py)) {
                            launch = Some(cell.url.clone());
                        }
                    }
                }
                ui.label(
                    egui::RichText::new("Click a cell to open its link.")
                        .small()
                        .weak(),
                );
            });

        if let Some(url) = launch {
            if url == render::UNSET_URL_TAG {
                log::debug!("Ignoring click on a cell with no link set");
            } else if let Err(err) = open::that(&url) {
                self.report("open link", anyhow::anyhow!(err));
            } else {
                log::info!("Launched {url}");
            }
        }
        if !open_flag {
            self.preview = None;
        }
    }
}

impl eframe::App for LaunchGridApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_icon_results(ctx);
        self.poll_photo_pick();
        self.poll_background_pick();
        self.poll_preview(ctx);

        self.draw_list(ctx);
        self.draw_edit_dialog(ctx);
        self.draw_preview(ctx);

        // Keep polling while an off-thread picker or render is outstanding.
        if self.pending_photo_pick.is_some()
            || self.pending_background_pick.is_some()
            || self.preview_rx.is_some()
        {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
    }
}
