//! PersonaAgent Desktop: egui app state and UI.

use eframe::egui;
use persona::config::Config;
use persona::driver::{Dispatch, Handoff, Notice, TurnError};
use persona::flow::{Route, Screen};
use persona::gateway::{AgentGateway, RoundTrip};
use persona::results::{ResultsView, Section};
use persona::session::TurnMessage;
use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

const LOG_BUFFER_MAX_LINES: usize = 500;
const CONTENT_MAX_WIDTH: f32 = 720.0;

/// Ring buffer of log lines for the Diagnostics section.
static LOG_LINES: OnceLock<Mutex<VecDeque<String>>> = OnceLock::new();

fn log_buffer() -> &'static Mutex<VecDeque<String>> {
    LOG_LINES.get_or_init(|| Mutex::new(VecDeque::new()))
}

fn push_log_line(line: String) {
    if let Ok(mut buf) = log_buffer().lock() {
        buf.push_back(line);
        while buf.len() > LOG_BUFFER_MAX_LINES {
            buf.pop_front();
        }
    }
}

/// Logger that appends to LOG_LINES. Our crates log at debug; dependencies at info and above.
struct DesktopLogger;

impl log::Log for DesktopLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::Info || metadata.target().starts_with("persona")
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        push_log_line(format!(
            "{} [{}] {}",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            record.level(),
            record.args()
        ));
    }

    fn flush(&self) {}
}

static LOGGER: DesktopLogger = DesktopLogger;

type TurnOutcome = Result<RoundTrip, TurnError>;

/// What the user asked for this frame; applied after rendering so the screen can be replaced.
enum ChatAction {
    Submit,
    CompleteAnalysis,
}

pub struct PersonaApp {
    config: Config,
    /// Active screen and the state it owns (the chat screen owns its driver).
    screen: Screen,
    /// When Some, a round-trip is in flight; we read the result here.
    turn_receiver: Option<mpsc::Receiver<TurnOutcome>>,
    /// Latest notification shown over the chat (dismissable).
    notice: Option<Notice>,
    /// Config load error, shown on the landing screen.
    config_error: Option<String>,
}

impl PersonaApp {
    /// Space between a screen title and the content below.
    const SCREEN_TITLE_BOTTOM_SPACING: f32 = 18.0;
    /// Space between the bottom of the content and the window edge.
    const SCREEN_FOOTER_SPACING: f32 = 24.0;

    pub fn new(_cc: &eframe::CreationContext<'_>, start: Route) -> Self {
        let _ = LOG_LINES.get_or_init(|| Mutex::new(VecDeque::new()));
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(log::LevelFilter::Debug);
        log::info!("desktop started");

        let (config, config_error) = match persona::config::load_config(None) {
            Ok((config, path)) => {
                log::debug!("config loaded from {}", path.display());
                (config, None)
            }
            Err(e) => {
                log::error!("config load failed, using defaults: {:#}", e);
                (Config::default(), Some(format!("{:#}", e)))
            }
        };
        let mut app = Self {
            config,
            screen: Screen::Landing,
            turn_receiver: None,
            notice: None,
            config_error,
        };
        app.navigate(start, None);
        app
    }

    /// Replace the active screen. Leaving the chat discards its session and any in-flight result.
    fn navigate(&mut self, route: Route, handoff: Option<Handoff>) {
        self.turn_receiver = None;
        self.notice = None;
        let (screen, dispatch) = Screen::activate(route, handoff);
        log::debug!("navigate {} -> {}", route.path(), screen.route().path());
        self.screen = screen;
        if let Some(dispatch) = dispatch {
            self.start_round_trip(dispatch);
        }
    }

    /// Run one gateway round-trip on a background thread.
    fn start_round_trip(&mut self, dispatch: Dispatch) {
        let config = self.config.clone();
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    // Dropping tx is reported as an interrupted turn.
                    log::error!("failed to start runtime for round-trip: {}", e);
                    return;
                }
            };
            let result = rt.block_on(async move {
                let gateway = AgentGateway::from_config(&config)?;
                gateway.send(&dispatch.text, &dispatch.session_id).await
            });
            let _ = tx.send(result.map_err(TurnError::from));
        });
        self.turn_receiver = Some(rx);
    }

    /// Poll for the round-trip result and hand it to the driver. Call each frame.
    fn poll_round_trip(&mut self) {
        let Some(rx) = &self.turn_receiver else {
            return;
        };
        let outcome = match rx.try_recv() {
            Ok(outcome) => outcome,
            Err(mpsc::TryRecvError::Empty) => return,
            Err(mpsc::TryRecvError::Disconnected) => Err(TurnError::Interrupted),
        };
        self.turn_receiver = None;
        if let Screen::Chat(driver) = &mut self.screen {
            driver.resolve(outcome);
            if let Some(notice) = driver.take_notice() {
                self.notice = Some(notice);
            }
        }
    }

    fn submit(&mut self) {
        let Screen::Chat(driver) = &mut self.screen else {
            return;
        };
        if let Some(dispatch) = driver.submit() {
            self.notice = None;
            self.start_round_trip(dispatch);
        }
    }

    fn complete_analysis(&mut self) {
        match std::mem::take(&mut self.screen) {
            Screen::Chat(driver) => match driver.confirm() {
                Ok(handoff) => self.navigate(Route::Results, Some(handoff)),
                Err(driver) => self.screen = Screen::Chat(driver),
            },
            other => self.screen = other,
        }
    }

    fn ui_landing(&mut self, ui: &mut egui::Ui) {
        ui.add_space(64.0);
        ui.vertical_centered(|ui| {
            ui.heading(egui::RichText::new("Discover your personality type").size(28.0));
            ui.add_space(Self::SCREEN_TITLE_BOTTOM_SPACING);
            ui.label(
                "Chat with PersonaAgent, an AI that asks a few questions and works out \
                 your personality profile from your answers.",
            );
            ui.add_space(24.0);
            if ui
                .add(egui::Button::new(egui::RichText::new("Start the test").size(18.0)))
                .clicked()
            {
                self.navigate(Route::Chat, None);
            }
            if let Some(ref err) = self.config_error {
                ui.add_space(16.0);
                ui.colored_label(egui::Color32::RED, format!("Config: {}", err));
            }
        });
    }

    /// Renders one chat bubble: user turns strong on the extreme background, agent turns on panel fill.
    fn render_turn(ui: &mut egui::Ui, m: &TurnMessage) {
        let is_user = m.is_user();
        let frame = egui::Frame::none()
            .fill(if is_user {
                ui.style().visuals.extreme_bg_color
            } else {
                ui.style().visuals.panel_fill
            })
            .stroke(egui::Stroke::new(
                1.0,
                ui.style().visuals.widgets.noninteractive.bg_stroke.color,
            ))
            .rounding(egui::Rounding::same(8.0))
            .inner_margin(egui::Margin::same(8.0));

        let layout = if is_user {
            egui::Layout::right_to_left(egui::Align::Min)
        } else {
            egui::Layout::left_to_right(egui::Align::Min)
        };
        ui.with_layout(layout, |ui| {
            ui.set_max_width(ui.available_width() * 0.8);
            frame.show(ui, |ui| {
                if is_user {
                    ui.label(egui::RichText::new(&m.text).strong());
                } else {
                    ui.label(&m.text);
                }
            });
        });
    }

    fn ui_chat(&mut self, ui: &mut egui::Ui) -> Option<ChatAction> {
        let Screen::Chat(driver) = &mut self.screen else {
            return None;
        };
        let mut action = None;

        if let Some(notice) = self.notice.clone() {
            ui.horizontal(|ui| {
                ui.colored_label(
                    egui::Color32::RED,
                    format!("{}: {}", notice.title, notice.description),
                );
                if ui.small_button("✕").clicked() {
                    self.notice = None;
                }
            });
            ui.add_space(8.0);
        }

        let row_height = ui.spacing().interact_size.y + 8.0;
        let reserved = row_height * 3.0 + 64.0 + Self::SCREEN_FOOTER_SPACING;
        let messages_height = (ui.available_height() - reserved).max(80.0);
        egui::ScrollArea::vertical()
            .max_height(messages_height)
            .stick_to_bottom(true)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for m in driver.log() {
                    Self::render_turn(ui, m);
                    ui.add_space(8.0);
                }
                if driver.is_awaiting() {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("PersonaAgent is thinking…");
                    });
                }
            });

        ui.add_space(8.0);
        if driver.profile().is_some() {
            let button = egui::Button::new(
                egui::RichText::new("Complete Analysis & View Results").strong(),
            );
            if ui
                .add_sized([ui.available_width(), row_height], button)
                .clicked()
            {
                action = Some(ChatAction::CompleteAnalysis);
            }
            ui.add_space(8.0);
        }

        ui.horizontal(|ui| {
            let input_enabled = driver.input_enabled();
            let input_width = (ui.available_width() - 80.0).max(120.0);
            let response = ui.add_enabled(
                input_enabled,
                egui::TextEdit::singleline(driver.input_mut())
                    .hint_text("Type your message here...")
                    .desired_width(input_width),
            );
            let enter = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            let send = ui
                .add_enabled(driver.can_submit(), egui::Button::new("Send"))
                .clicked();
            if (send || enter) && driver.can_submit() {
                action = Some(ChatAction::Submit);
                response.request_focus();
            }
        });

        ui.add_space(12.0);
        egui::CollapsingHeader::new("Diagnostics")
            .default_open(false)
            .show(ui, |ui| {
                ui.label(format!("Session: {}", driver.session_id()));
                let lines: Vec<String> = log_buffer()
                    .lock()
                    .map(|b| b.iter().cloned().collect())
                    .unwrap_or_default();
                egui::ScrollArea::vertical()
                    .max_height(160.0)
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        for line in &lines {
                            ui.label(
                                egui::RichText::new(line.as_str())
                                    .family(egui::FontFamily::Monospace),
                            );
                        }
                        if lines.is_empty() {
                            ui.label("No log output yet.");
                        }
                    });
            });
        ui.add_space(Self::SCREEN_FOOTER_SPACING);
        action
    }

    fn ui_section(ui: &mut egui::Ui, section: &Section) {
        ui.group(|ui| {
            ui.set_width(ui.available_width());
            ui.strong(section.heading);
            ui.add_space(6.0);
            for item in &section.items {
                ui.label(format!("• {}", item));
            }
        });
    }

    /// Returns true when the user asked to start again.
    fn ui_results(ui: &mut egui::Ui, view: &ResultsView) -> bool {
        let mut start_again = false;
        egui::ScrollArea::vertical().show(ui, |ui| {
            ui.add_space(24.0);
            ui.vertical_centered(|ui| {
                ui.heading(egui::RichText::new(&view.title).size(28.0));
                ui.label(egui::RichText::new(&view.subtitle).size(20.0).italics());
            });
            ui.add_space(Self::SCREEN_TITLE_BOTTOM_SPACING);

            ui.group(|ui| {
                ui.set_width(ui.available_width());
                ui.strong(view.characteristics.heading);
                ui.add_space(6.0);
                ui.horizontal_wrapped(|ui| {
                    for trait_name in &view.characteristics.items {
                        ui.label(egui::RichText::new(trait_name).background_color(
                            ui.style().visuals.faint_bg_color,
                        ));
                    }
                });
            });
            ui.add_space(12.0);
            ui.columns(2, |cols| {
                Self::ui_section(&mut cols[0], &view.strengths);
                Self::ui_section(&mut cols[1], &view.growth_areas);
            });
            ui.add_space(12.0);
            ui.group(|ui| {
                ui.set_width(ui.available_width());
                ui.strong(view.famous_heading);
                ui.add_space(6.0);
                for example in &view.famous_examples {
                    match &example.image_url {
                        Some(url) => {
                            ui.hyperlink_to(example.name.as_str(), url);
                        }
                        None => {
                            ui.label(example.name.as_str());
                        }
                    }
                }
            });
            ui.add_space(24.0);
            ui.vertical_centered(|ui| {
                if ui.button("Start Again").clicked() {
                    start_again = true;
                }
            });
            ui.add_space(Self::SCREEN_FOOTER_SPACING);
        });
        start_again
    }
}

impl eframe::App for PersonaApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_round_trip();
        if self.turn_receiver.is_some() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        let degraded = matches!(&self.screen, Screen::Chat(d) if d.is_degraded());
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            egui::Frame::none()
                .inner_margin(egui::Margin::symmetric(24.0, 0.0))
                .show(ui, |ui| {
                    ui.add_space(16.0);
                    ui.horizontal(|ui| {
                        ui.heading("PersonaAgent");
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if degraded {
                                ui.colored_label(
                                    egui::Color32::from_rgb(200, 140, 0),
                                    "offline demo mode",
                                )
                                .on_hover_text(
                                    "The agent could not be reached; answers come from a local demo responder.",
                                );
                            }
                        });
                    });
                    ui.add_space(16.0);
                });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let margin = ((ui.available_width() - CONTENT_MAX_WIDTH) / 2.0).max(24.0);
            egui::Frame::none()
                .inner_margin(egui::Margin::symmetric(margin, 0.0))
                .show(ui, |ui| match self.screen.route() {
                    Route::Landing => self.ui_landing(ui),
                    Route::Chat => {
                        ui.add_space(16.0);
                        match self.ui_chat(ui) {
                            Some(ChatAction::Submit) => self.submit(),
                            Some(ChatAction::CompleteAnalysis) => self.complete_analysis(),
                            None => {}
                        }
                    }
                    Route::Results => {
                        let Screen::Results(profile) = &self.screen else {
                            return;
                        };
                        let view = ResultsView::from_profile(profile);
                        if Self::ui_results(ui, &view) {
                            self.navigate(Route::Landing, None);
                        }
                    }
                });
        });
    }
}
