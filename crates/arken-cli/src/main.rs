//! Arken CLI - companion chat and frame-loop simulation
//!
//! Terminal frontend for the Arken core: talk to the AI companion, run the
//! camera and locomotion loop headless, and manage settings.

mod config;

use anyhow::{bail, Context, Result};
use arken::{
    ChatLayout, ChatPanel, CompanionBridge, HttpChatTransport, InputRouter, Key, KeyState,
    SessionContext, Simulation, THINKING_LINE,
};
use clap::{Parser, Subcommand};
use colored::Colorize;
use dialoguer::{Input, Password};
use glam::Vec3;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;

#[derive(Parser)]
#[command(name = "arken")]
#[command(about = "Arken CLI - companion chat and frame-loop simulation", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging (stderr)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the companion
    Chat,

    /// Run the camera and locomotion loop with scripted forward input
    Simulate {
        /// Number of frames to run
        #[arg(short, long, default_value = "120")]
        frames: u64,
        /// Frames per second
        #[arg(long, default_value = "60")]
        fps: f32,
        /// Hold sprint the whole run
        #[arg(long)]
        sprint: bool,
        /// Press jump on this frame (0-based)
        #[arg(long)]
        jump_at: Option<u64>,
        /// Spawn point, e.g. "0,0,0"
        #[arg(long, value_delimiter = ',', num_args = 3, allow_negative_numbers = true)]
        spawn: Option<Vec<f32>>,
        /// Print every N frames (defaults to once per simulated second)
        #[arg(long)]
        every: Option<u64>,
    },

    /// Show or change configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set the chat-completions endpoint
    SetUrl {
        url: String,
    },
    /// Set the model identifier
    SetModel {
        model: String,
    },
    /// Store an API key (will prompt if not provided)
    SetKey {
        key: Option<String>,
    },
    /// Restore defaults
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Chat => cmd_chat().await,
        Commands::Simulate { frames, fps, sprint, jump_at, spawn, every } => {
            cmd_simulate(frames, fps, sprint, jump_at, spawn, every)
        }
        Commands::Config { action } => cmd_config(action.unwrap_or(ConfigAction::Show)),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("arken=debug,arken_cli=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("arken=info"))
    };

    // stderr keeps logs out of the transcript
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// ============================================
// Command Implementations
// ============================================

async fn cmd_chat() -> Result<()> {
    let config = Config::load_with_env()?;
    let companion = config.companion.clone();

    let session = SessionContext::new();
    let transport =
        HttpChatTransport::new(&companion).context("Failed to create companion transport")?;
    let bridge = CompanionBridge::builder()
        .config(companion.clone())
        .transport(transport)
        .session(session.clone())
        .build()
        .context("Failed to build companion bridge")?;
    let (handle, worker) = bridge.start();

    let mut panel = ChatPanel::new();
    panel.attach(handle);
    let rows = transcript_rows(&ChatLayout::default());

    println!(
        "{} {} ({})",
        "Companion".bold(),
        companion.model.cyan(),
        companion.api_url.dimmed()
    );
    println!(
        "{}",
        "Commands: /clear, /history, /up, /down, /quit. Ctrl-C cancels a pending reply; use /quit to leave."
            .dimmed()
    );

    let mut printed = 0;
    loop {
        let line: String = Input::new()
            .with_prompt("You")
            .allow_empty(true)
            .interact_text()
            .context("Failed to read input")?;

        match line.trim() {
            "/quit" | "/exit" => break,
            "/clear" => {
                session.clear();
                panel.clear();
                printed = 0;
                println!("{}", "Conversation cleared.".dimmed());
                continue;
            }
            "/history" => {
                let history = session.render();
                if history.is_empty() {
                    println!("{}", "(no messages yet)".dimmed());
                } else {
                    println!("{}", history);
                }
                continue;
            }
            "/up" => {
                panel.scroll_up(rows);
                print_window(&panel, rows);
                continue;
            }
            "/down" => {
                panel.scroll_down(rows);
                print_window(&panel, rows);
                continue;
            }
            _ => {}
        }

        panel.set_input(line);
        if panel.submit().is_none() {
            continue;
        }
        // Player's own line is already on screen from the prompt
        printed = panel.lines().len();

        // The prompt ignores SIGINT once this handler is installed, so /quit is the way out
        while panel.is_busy() {
            let interrupted = tokio::select! {
                event = panel.next_event() => {
                    if event.is_none() {
                        bail!("Companion worker stopped unexpectedly");
                    }
                    false
                }
                _ = tokio::signal::ctrl_c() => true,
            };
            if interrupted {
                panel.cancel_pending();
                println!("{}", "Cancelled.".yellow());
            }
            printed = print_new_lines(&panel, printed);
        }
    }

    // Dropping the last handle lets the worker drain and exit
    panel.detach();
    worker.await.context("Companion worker panicked")?;
    info!(messages = session.len(), "Chat session ended");
    Ok(())
}

/// Rows of text that fit the default transcript area
fn transcript_rows(layout: &ChatLayout) -> usize {
    const LINE_HEIGHT: f32 = 20.0;
    (layout.scroll_view().height / LINE_HEIGHT).floor().max(1.0) as usize
}

fn print_new_lines(panel: &ChatPanel, printed: usize) -> usize {
    let lines = panel.lines();
    // A rebuilt transcript can be shorter than what was already printed
    let printed = if printed > lines.len() { 0 } else { printed };
    for line in &lines[printed..] {
        print_line(line);
    }
    lines.len()
}

/// Transcript window at the panel's scroll position
fn print_window(panel: &ChatPanel, rows: usize) {
    let scroll = panel.scroll();
    let position = if scroll.is_at_bottom() {
        "bottom".to_string()
    } else {
        format!("{} lines up", scroll.lines_from_bottom())
    };
    println!("{}", format!("--- transcript ({position}) ---").dimmed());
    for line in panel.visible_lines(rows) {
        print_line(line);
    }
}

fn print_line(line: &str) {
    if line == THINKING_LINE {
        println!("{}", line.dimmed());
    } else if let Some(reply) = line.strip_prefix("Companion: ") {
        println!("{} {}", "Companion:".green().bold(), reply);
    } else {
        println!("{}", line);
    }
}

fn cmd_simulate(
    frames: u64,
    fps: f32,
    sprint: bool,
    jump_at: Option<u64>,
    spawn: Option<Vec<f32>>,
    every: Option<u64>,
) -> Result<()> {
    if !(fps.is_finite() && fps > 0.0) {
        bail!("--fps must be a positive number");
    }
    let config = Config::load()?;

    let spawn_point = match spawn.as_deref() {
        Some([x, y, z]) => Some(Vec3::new(*x, *y, *z)),
        Some(_) => bail!("--spawn takes exactly three values: x,y,z"),
        None => None,
    };

    let dt = 1.0 / fps;
    let every = every.unwrap_or_else(|| fps.round().max(1.0) as u64).max(1);
    let mut sim = Simulation::new(config.locomotion, config.camera, spawn_point);
    let mut input = InputRouter::new(Some(config.input.clone()));

    let forward = config.input.move_up.first().copied().unwrap_or(Key::W);
    let sprint_key = config.input.sprint.first().copied().unwrap_or(Key::LeftShift);
    let jump_key = config.input.jump.first().copied().unwrap_or(Key::Space);

    println!(
        "{:>6} {:>7}  {:<26} {:>7} {:>6} {:>8}  {:<26}",
        "frame".bold(),
        "time".bold(),
        "player".bold(),
        "heading".bold(),
        "speed".bold(),
        "ground".bold(),
        "camera".bold()
    );

    for frame in 0..frames {
        let mut keys = KeyState::new().with(forward);
        if sprint {
            keys.press(sprint_key);
        }
        if jump_at == Some(frame) {
            keys.press(jump_key);
        }

        let report = sim.step(&mut input, &keys, dt);
        if report.frame % every == 0 || report.frame == frames {
            let grounded = if report.motion.grounded {
                "yes".green()
            } else {
                "no".yellow()
            };
            println!(
                "{:>6} {:>6.2}s  {:<26} {:>6.1}° {:>6.2} {:>8}  {:<26}",
                report.frame,
                sim.elapsed(),
                format_vec(report.player.position),
                report.player.yaw_degrees(),
                report.motion.speed,
                grounded,
                format_vec(report.camera.position).dimmed()
            );
        }
    }

    Ok(())
}

fn format_vec(v: Vec3) -> String {
    format!("({:.2}, {:.2}, {:.2})", v.x, v.y, v.z)
}

fn cmd_config(action: ConfigAction) -> Result<()> {
    let mut config = Config::load()?;

    match action {
        ConfigAction::Show => {
            let effective = Config::load_with_env()?;
            let companion = &effective.companion;

            println!("{}", "Configuration:".bold());
            println!("  Path: {:?}", Config::config_path()?);
            println!("  API URL: {}", companion.api_url);
            println!("  Model: {}", companion.model.cyan());
            println!(
                "  API Key: {}",
                if companion.bearer_token().is_some() { "Set".green() } else { "Not set".red() }
            );
            println!("  Timeout: {}s", companion.timeout_secs);
            println!(
                "  Camera: distance {} height {} damping {}/{}",
                effective.camera.follow_distance,
                effective.camera.height_offset,
                effective.camera.position_damping,
                effective.camera.rotation_damping
            );
            println!(
                "  Locomotion: speed {} sprint x{} jump {}m",
                effective.locomotion.move_speed,
                effective.locomotion.sprint_multiplier,
                effective.locomotion.jump_height
            );
        }

        ConfigAction::SetUrl { url } => {
            config.companion.api_url = url.clone();
            config.save()?;
            println!("{} API URL set to {}", "✓".green(), url);
        }

        ConfigAction::SetModel { model } => {
            config.companion.model = model.clone();
            config.save()?;
            println!("{} Model set to {}", "✓".green(), model.cyan());
        }

        ConfigAction::SetKey { key } => {
            let api_key = match key {
                Some(k) => k,
                None => Password::new()
                    .with_prompt("API Key (empty to clear)")
                    .allow_empty_password(true)
                    .interact()
                    .context("Failed to read API key")?,
            };
            config.set_api_key(api_key);
            config.save()?;

            if config.companion.api_key.is_some() {
                println!("{} API key saved to {:?}", "✓".green(), Config::config_path()?);
            } else {
                println!("{} API key cleared", "✓".green());
            }
        }

        ConfigAction::Reset => {
            Config::default().save()?;
            println!("{} Configuration reset to defaults", "✓".green());
        }
    }

    Ok(())
}
