//! talos - command-line client for the Talos secret server.
//!
//! Commands:
//! - status: auth mode, subsystem LEDs and session countdown
//! - health: storage and bunker liveness
//! - version: client and server versions
//! - shell: interactive session (default)

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use talos_api::{ApiTransport, ReqwestTransport, validate_base_url};
use talos_app::config::LOG_ENV;
use talos_app::{
    ActionOutcome, App, ClientConfig, Submitted, app_version, project_runtime_status,
    redact_sensitive,
};
use talos_auth::{LoginForm, SetupForm, SetupMode};
use talos_contract::TreeNode;
use talos_core::PasswordPolicy;
use talos_ui::{EditForm, Notification, NotificationLevel, Screen, UiState};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

#[derive(Parser)]
#[command(name = "talos")]
#[command(about = "Client for the Talos secret server")]
#[command(version = talos_app::APP_VERSION)]
struct Cli {
    /// Server base URL (overrides TALOS_URL)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Idle seconds before automatic logout (overrides TALOS_IDLE_TIMEOUT_SECS)
    #[arg(long, global = true)]
    idle_timeout: Option<u64>,

    /// PEM bundle with client certificate and key (overrides TALOS_CLIENT_IDENTITY)
    #[arg(long, global = true)]
    identity: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show auth mode, subsystem LEDs and session countdown
    Status,
    /// Probe storage and bunker liveness
    Health,
    /// Show client and server versions
    Version,
    /// Start an interactive session
    Shell,
}

type InputLines = Lines<BufReader<Stdin>>;

enum Flow {
    Continue,
    Quit,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    let transport = ReqwestTransport::new(&config.transport_config()?)
        .context("failed to build http client")?;
    let app = App::new(&config, Arc::new(transport) as Arc<dyn ApiTransport>)?;

    match cli.command.unwrap_or(Commands::Shell) {
        Commands::Status => {
            app.load().await;
            print_status(&app.ui());
        }
        Commands::Health => {
            let healthy = app.reconnect().await;
            print_status(&app.ui());
            if !healthy {
                bail!("backend frozen");
            }
        }
        Commands::Version => {
            println!("client {}", app_version());
            match app.api().version().await {
                Ok(info) => println!("server {}", info.version),
                Err(error) => println!("server unavailable ({})", error.user_message()),
            }
        }
        Commands::Shell => run_shell(app).await?,
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn resolve_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = &cli.url {
        config.server_url = validate_base_url(url)?;
    }
    if let Some(seconds) = cli.idle_timeout {
        if seconds == 0 {
            bail!("--idle-timeout must be positive");
        }
        config.idle_timeout = Duration::from_secs(seconds);
    }
    if let Some(identity) = &cli.identity {
        config.identity_path = Some(identity.clone());
    }
    Ok(config)
}

async fn run_shell(app: App) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut updates = app.subscribe();

    app.load().await;
    let mut screen = app.ui().screen;
    announce(&app.ui());

    loop {
        prompt(&app.ui());
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                app.record_activity();
                if let Flow::Quit = dispatch(&app, &mut lines, line.trim()).await? {
                    break;
                }
                screen = app.ui().screen;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = updates.borrow_and_update().screen;
                if current != screen {
                    if screen == Screen::Vault {
                        println!("\nsession closed");
                    }
                    screen = current;
                    announce(&app.ui());
                }
            }
        }
    }

    Ok(())
}

async fn dispatch(app: &App, lines: &mut InputLines, line: &str) -> Result<Flow> {
    let (command, argument) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };
    let snapshot = app.ui();
    let screen = snapshot.screen;
    let seen = snapshot.last_notification().cloned();

    match (screen, command) {
        (_, "") => {}
        (_, "quit" | "exit") => return Ok(Flow::Quit),
        (_, "help") => print_help(screen),
        (_, "reload") => {
            app.load().await;
            announce(&app.ui());
        }
        (_, "status") => print_status(&app.ui()),
        (Screen::Setup, "setup") => run_setup(app, lines, argument).await?,
        (Screen::Login, "login") => run_login(app).await?,
        (Screen::Vault, "tree") => {
            if let ActionOutcome::Completed(tree) = app.load_tree().await {
                print_tree(&tree, 0);
            }
        }
        (Screen::Vault, "show") => {
            if let ActionOutcome::Completed(view) = app.open_record(argument).await {
                println!("{}", view.name);
                for (label, value) in view.rows() {
                    println!("  {label:<9}{value}");
                }
                println!("  {}", view.description);
            }
        }
        (Screen::Vault, "reveal") => {
            if let ActionOutcome::Completed(secret) = app.reveal_password(argument).await {
                println!("{}", secret.as_str());
            }
        }
        (Screen::Vault, "edit") => {
            if let ActionOutcome::Completed(mut form) = app.edit_record(argument).await {
                fill_form(lines, &mut form).await?;
                app.save(&form).await;
            }
        }
        (Screen::Vault, "new") => {
            let mut form = app.new_record((!argument.is_empty()).then_some(argument));
            fill_form(lines, &mut form).await?;
            app.save(&form).await;
        }
        (Screen::Vault, "rm") => {
            if confirm(lines, &format!("DELETE {argument} PERMANENTLY?")).await? {
                app.delete(argument).await;
            }
        }
        (Screen::Vault, "mkdir") => {
            app.create_category(argument).await;
        }
        (Screen::Vault, "gen") => {
            let policy = policy_from_argument(argument)?;
            let generated = talos_core::generate_password(&policy)?;
            println!("{}", generated.as_str());
        }
        (Screen::Vault, "reconnect") => {
            app.reconnect().await;
            print_status(&app.ui());
        }
        (Screen::Vault, "logout") => {
            app.logout().await;
        }
        (_, other) => println!("unknown command {other:?}; try 'help'"),
    }

    print_new_notifications(app, seen.as_ref());
    Ok(Flow::Continue)
}

async fn run_setup(app: &App, lines: &mut InputLines, argument: &str) -> Result<()> {
    let mut form = SetupForm::new();
    if argument.is_empty() {
        println!("master passphrase: {}", form.generate.regenerate()?);
        println!("store it now; it cannot be recovered");
        if !confirm(lines, "initialize with this passphrase?").await? {
            return Ok(());
        }
    } else {
        form.select_mode(SetupMode::Import);
        let armored = std::fs::read_to_string(argument)
            .with_context(|| format!("cannot read private key {argument}"))?;
        form.import.private_key = Zeroizing::new(armored);
        form.import.passphrase = Zeroizing::new(rpassword::prompt_password("key passphrase: ")?);
    }

    if let Submitted::Reloaded(_) = app.submit_setup(form).await {
        println!("vault initialized");
    }
    Ok(())
}

async fn run_login(app: &App) -> Result<()> {
    let mut form = LoginForm::new();
    form.key = Zeroizing::new(rpassword::prompt_password("master key: ")?);
    if let Submitted::Reloaded(_) = app.submit_login(form).await {
        println!("access granted");
    }
    Ok(())
}

async fn fill_form(lines: &mut InputLines, form: &mut EditForm) -> Result<()> {
    form.path = ask(lines, "path", &form.path).await?;
    form.username = ask(lines, "user", &form.username).await?;
    form.url = ask(lines, "url", &form.url).await?;
    form.note = ask_note(lines, &form.note).await?;

    if confirm(lines, "generate a new password?").await? {
        form.generate_password(&PasswordPolicy::default())?;
        return Ok(());
    }
    let hint = form.password_placeholder().unwrap_or("leave empty for none");
    let typed = Zeroizing::new(rpassword::prompt_password(format!("password ({hint}): "))?);
    if !(typed.is_empty() && form.keeps_stored_password()) {
        form.set_password(&typed);
    }
    Ok(())
}

/// Answer meaning "clear this field".
const CLEAR_ANSWER: &str = "-";
/// Line that ends a multi-line note.
const NOTE_END: &str = ".";

async fn ask(lines: &mut InputLines, label: &str, current: &str) -> Result<String> {
    print!("{label} [{current}] ('{CLEAR_ANSWER}' clears): ");
    io::stdout().flush()?;
    let answer = lines.next_line().await?.unwrap_or_default();
    Ok(field_answer(&answer, current))
}

fn field_answer(answer: &str, current: &str) -> String {
    match answer.trim() {
        "" => current.to_string(),
        CLEAR_ANSWER => String::new(),
        answer => answer.to_string(),
    }
}

async fn ask_note(lines: &mut InputLines, current: &str) -> Result<String> {
    if !current.is_empty() {
        println!("current note:\n{current}");
    }
    println!(
        "note: empty line keeps it, '{CLEAR_ANSWER}' clears, otherwise type lines and end with '{NOTE_END}'"
    );

    let mut typed = Vec::new();
    while let Some(line) = lines.next_line().await? {
        if typed.is_empty() && (line.trim().is_empty() || line.trim() == CLEAR_ANSWER) {
            return Ok(field_answer(&line, current));
        }
        if line.trim() == NOTE_END {
            break;
        }
        typed.push(line);
    }
    Ok(note_from_lines(&typed, current))
}

fn note_from_lines(typed: &[String], current: &str) -> String {
    if typed.is_empty() {
        current.to_string()
    } else {
        typed.join("\n")
    }
}

async fn confirm(lines: &mut InputLines, question: &str) -> Result<bool> {
    print!("{question} [y/N]: ");
    io::stdout().flush()?;
    let answer = lines.next_line().await?.unwrap_or_default();
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn policy_from_argument(argument: &str) -> Result<PasswordPolicy> {
    let mut policy = PasswordPolicy::default();
    if !argument.is_empty() {
        policy.length = argument
            .parse()
            .with_context(|| format!("invalid length {argument:?}"))?;
    }
    Ok(policy)
}

fn prompt(state: &UiState) {
    let session = state
        .countdown_label()
        .map(|label| format!(" {label}"))
        .unwrap_or_default();
    let frozen = if state.screen == Screen::Vault && state.frozen {
        " FROZEN"
    } else {
        ""
    };
    print!("talos[{:?}{session}{frozen}]> ", state.screen);
    let _ = io::stdout().flush();
}

fn announce(state: &UiState) {
    match state.screen {
        Screen::Loading => {}
        Screen::Setup => println!("no master key yet: 'setup' to generate, 'setup <key-file>' to import"),
        Screen::Login => println!("vault locked: 'login' to unlock"),
        Screen::Vault => {
            let badge = state.badge.map(|badge| badge.label()).unwrap_or_default();
            println!("vault open [{badge}]: {} records", TreeNode::record_paths(&state.tree).len());
        }
        Screen::Unreachable => println!(
            "server unreachable: {}",
            redact_sensitive(state.unreachable_reason.as_deref().unwrap_or("unknown"))
        ),
    }
}

fn print_help(screen: Screen) {
    println!("always: help, status, reload, quit");
    match screen {
        Screen::Setup => println!("setup: setup [key-file]"),
        Screen::Login => println!("login: login"),
        Screen::Vault => println!(
            "vault: tree, show <path>, reveal <path>, edit <path>, new [category], rm <path>, mkdir <path>, gen [length], reconnect, logout"
        ),
        Screen::Loading | Screen::Unreachable => {}
    }
}

fn print_status(state: &UiState) {
    let status = project_runtime_status(state);
    println!("screen   {}", status.screen);
    if !status.badge.is_empty() {
        println!("auth     {}", status.badge);
    }
    println!("storage  {}", status.storage);
    println!("bunker   {}", status.bunker);
    if !status.session.is_empty() {
        println!("session  {}", status.session);
    }
    println!("actions  {}", if status.actions_allowed { "enabled" } else { "blocked" });
}

fn print_tree(nodes: &[TreeNode], depth: usize) {
    for node in nodes {
        let suffix = if node.is_dir { "/" } else { "" };
        println!("{}{}{suffix}", "  ".repeat(depth), node.name);
        print_tree(node.children(), depth + 1);
    }
}

fn print_new_notifications(app: &App, seen: Option<&Notification>) {
    let state = app.ui();
    let Some(latest) = state.last_notification() else {
        return;
    };
    if seen != Some(latest) {
        let marker = match latest.level {
            NotificationLevel::Error => "!",
            _ => "*",
        };
        println!("{marker} {}", latest.message);
    }
}
