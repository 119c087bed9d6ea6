use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::event::EventStream;
use futures::StreamExt;
use tracing::{info, warn};

use tui_uikit::core::{InputEvent, LayoutAxis, NodeId, NodeSpec, Notification};
use tui_uikit::terminal::{self, UiTerminal};
use tui_uikit::utils::logging::{init_logging, LogSink};
use tui_uikit::widgets::{
    enum_choices, AppFrame, Button, Container, DialogSpec, FormField, FormSpec, Label, ListPicker,
    LogBuffer, LogViewer, MenuItem, SlotSize, TextInput, Validator,
};
use tui_uikit::{KitConfig, Theme, ThemeVariant, WidgetHost};

const TICK: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[command(name = "uikit-demo")]
#[command(about = "Interactive tour of the terminal widget kit")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Config file path (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Do not capture the mouse
    #[arg(long)]
    no_mouse: bool,
}

/// Nodes the demo updates after creation
struct Demo {
    frame: NodeId,
    progress: NodeId,
    fraction: f64,
}

const HELP: &str = "Tab: next  Shift+Tab: previous  Esc: menu  q: quit";

fn main_menu(current: ThemeVariant) -> Vec<MenuItem> {
    let current = match current {
        ThemeVariant::Dark => "dark",
        ThemeVariant::Light => "light",
        ThemeVariant::HighContrast => "high_contrast",
    };
    vec![
        MenuItem::submenu(
            "Dialogs",
            vec![
                MenuItem::action("Confirm", "dialog.confirm"),
                MenuItem::action("Profile form", "dialog.form"),
            ],
        ),
        enum_choices(
            "Theme",
            [
                ("dark", "Dark"),
                ("light", "Light"),
                ("high_contrast", "High contrast"),
            ],
            current,
            "theme.",
        ),
        MenuItem::action("Add log marker", "log.marker"),
        MenuItem::Separator,
        MenuItem::disabled("Help"),
        MenuItem::action("Quit", "app.quit"),
    ]
}

fn build(host: &mut WidgetHost, log: LogBuffer) -> Result<Demo> {
    let frame = host.body();
    let body = AppFrame::body(host.tree(), frame)?;
    host.set_title(frame, "uikit demo")?;
    host.set_status(frame, HELP)?;

    let panes = host.add(
        body,
        NodeSpec::new(Container::new()).axis(LayoutAxis::Horizontal),
    )?;
    host.add(
        panes,
        NodeSpec::new(Container::new().title("Fruit")).child(NodeSpec::new(
            ListPicker::new(["banana", "apple", "cherry", "kiwi", "mango"])
                .sorted_by(|item| item.to_lowercase()),
        )),
    )?;
    host.add(
        panes,
        NodeSpec::new(Container::new().title("Log"))
            .weight(2)
            .child(NodeSpec::new(LogViewer::new(log))),
    )?;

    host.add(
        body,
        NodeSpec::new(TextInput::new().placeholder("type and press Enter").with_history(32))
            .pack()
            .name("command"),
    )?;
    let bar = NodeSpec::new(host.progress_bar());
    let progress = host.add_footer_widget(frame, bar, SlotSize::Given(20), None)?;

    host.focus_first()?;
    Ok(Demo {
        frame,
        progress,
        fraction: 0.0,
    })
}

fn confirm_dialog() -> DialogSpec {
    DialogSpec::new("Confirm")
        .child(NodeSpec::new(Label::new("Do you really want to do this?")))
        .button(Button::new("Yes").closes_dialog())
        .button(Button::new("No").closes_dialog())
}

fn profile_dialog() -> Result<DialogSpec> {
    let email = regex::Regex::new(r"^[^@\s]+@[^@\s]+$")?;
    let form = FormSpec::new()
        .title("Profile")
        .field(FormField::new("Name").required())
        .field(
            FormField::new("Email").validator(Validator::pattern(email, "not an email address")),
        )
        .field(FormField::new("Age").validator(Validator::custom(|value| {
            value
                .parse::<u8>()
                .map(|_| ())
                .map_err(|_| "must be a number".to_string())
        })))
        .build();
    Ok(DialogSpec::new("Edit profile")
        .size(48, 9)
        .child(form)
        .button(Button::new("Cancel").closes_dialog()))
}

/// React to what the widgets reported. Returns false to stop.
fn handle_notifications(host: &mut WidgetHost, demo: &Demo, log: &LogBuffer) -> Result<bool> {
    for notification in host.drain_notifications() {
        match notification {
            Notification::MenuActivated { command } => match command.as_str() {
                "dialog.confirm" => {
                    host.open_dialog(confirm_dialog())?;
                }
                "dialog.form" => {
                    host.open_dialog(profile_dialog()?)?;
                }
                "log.marker" => log.add_marker(),
                "app.quit" => return Ok(false),
                theme => {
                    let variant = match theme {
                        "theme.dark" => ThemeVariant::Dark,
                        "theme.light" => ThemeVariant::Light,
                        "theme.high_contrast" => ThemeVariant::HighContrast,
                        other => {
                            warn!(command = other, "unknown menu command");
                            continue;
                        }
                    };
                    host.set_theme(Theme::new(variant));
                    host.set_main_menu(main_menu(variant));
                }
            },
            Notification::Selected { item, .. } => {
                info!(item = %item, "selected");
                host.set_status(demo.frame, &format!("Picked {item}"))?;
            }
            Notification::TextCommitted { text, .. } => {
                info!(text = %text, "command entered");
                host.set_status(demo.frame, &format!("Entered {text}"))?;
            }
            Notification::ValidationFailed { field, reason, .. } => {
                warn!(field = %field, reason = %reason, "validation failed")
            }
            Notification::FormSubmitted { values, .. } => {
                info!(?values, "form submitted");
                host.close_topmost_dialog()?;
            }
            Notification::QuitRequested => return Ok(false),
            _ => {}
        }
    }
    Ok(true)
}

fn draw(terminal: &mut UiTerminal, host: &mut WidgetHost) -> Result<()> {
    if host.render_if_dirty()? {
        terminal.draw(|frame| frame.buffer_mut().merge(host.frame()))?;
    }
    Ok(())
}

async fn run(terminal: &mut UiTerminal, config: &KitConfig, log: LogBuffer) -> Result<()> {
    let frame = AppFrame::build(NodeSpec::new(Container::new()));
    let mut host = WidgetHost::new(config, terminal.size()?, frame)?;
    host.set_main_menu(main_menu(config.theme.variant));
    let mut demo = build(&mut host, log.clone())?;
    info!("demo started");

    let mut events = EventStream::new();
    let mut ticker = tokio::time::interval(TICK);

    loop {
        draw(terminal, &mut host)?;

        tokio::select! {
            maybe_event = events.next() => {
                let Some(event) = maybe_event else { break };
                if let Some(event) = InputEvent::from_crossterm(event?) {
                    if let Err(err) = host.dispatch(event) {
                        if !err.is_recoverable() {
                            return Err(err.into());
                        }
                        warn!(error = %err, "event dropped");
                    }
                }
            }
            _ = ticker.tick() => {
                demo.fraction = if demo.fraction >= 1.0 { 0.0 } else { demo.fraction + 0.01 };
                host.set_progress(demo.progress, demo.fraction)?;
            }
        }

        if log.take_dirty() {
            host.request_redraw();
        }
        if !handle_notifications(&mut host, &demo, &log)? || host.quit_requested() {
            break;
        }
    }

    info!("demo finished");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = KitConfig::load(cli.config.as_deref()).context("loading configuration")?;

    if !terminal::should_enable_terminal_ui() {
        bail!(
            "uikit-demo needs an interactive terminal of at least {}x{}",
            terminal::MIN_WIDTH,
            terminal::MIN_HEIGHT
        );
    }

    let log = LogBuffer::new(config.log.viewer_capacity);
    init_logging(cli.verbose, &config.log.level, LogSink::Viewer(log.clone()))?;

    let mut terminal = terminal::init_terminal(!cli.no_mouse)?;
    let result = run(&mut terminal, &config, log).await;
    terminal::restore_terminal(&mut terminal)?;
    result
}
