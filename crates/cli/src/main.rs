use clap::{Parser, Subcommand};
use persona::driver::{ConversationDriver, Dispatch};
use persona::flow::{Route, Screen};
use persona::gateway::{AgentGateway, HttpTransport, Source};
use persona::results::ResultsView;
use persona::session::{SessionId, TurnMessage};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "persona")]
#[command(about = "PersonaAgent CLI: a conversational personality test", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config file.
    Init {
        /// Config file path (default: PERSONA_CONFIG_PATH or ~/.persona/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Take the personality test interactively (landing, chat, results).
    Chat {
        /// Config file path (default: PERSONA_CONFIG_PATH or ~/.persona/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Agent base URL; overrides config and PERSONA_AGENT_URL.
        #[arg(long, value_name = "URL")]
        url: Option<String>,
    },

    /// Send a single message to the agent and print the round-trip as JSON.
    Send {
        /// Message text.
        #[arg(long, short)]
        message: String,

        /// Session id to continue (default: a new one).
        #[arg(long, value_name = "ID")]
        session: Option<String>,

        /// Config file path (default: PERSONA_CONFIG_PATH or ~/.persona/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Agent base URL; overrides config and PERSONA_AGENT_URL.
        #[arg(long, value_name = "URL")]
        url: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("persona {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Chat { config, url }) => {
            if let Err(e) = run_chat(config, url).await {
                log::error!("chat failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Send {
            message,
            session,
            config,
            url,
        }) => {
            if let Err(e) = run_send(config, url, message, session).await {
                log::error!("send failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(persona::config::default_config_path);
    let dir = persona::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

fn build_gateway(
    config_path: Option<PathBuf>,
    url: Option<String>,
) -> anyhow::Result<AgentGateway<HttpTransport>> {
    let (mut config, _) = persona::config::load_config(config_path)?;
    let gateway = match url {
        Some(u) => {
            config.agent.base_url = u;
            let transport = HttpTransport::new(&config.agent.base_url, config.agent.timeout_secs)?;
            AgentGateway::new(transport, config.agent.fallback)
        }
        None => AgentGateway::from_config(&config)?,
    };
    log::info!("agent endpoint: {}/call_agent", gateway.transport().base_url());
    Ok(gateway)
}

async fn run_send(
    config_path: Option<PathBuf>,
    url: Option<String>,
    message: String,
    session: Option<String>,
) -> anyhow::Result<()> {
    let gateway = build_gateway(config_path, url)?;
    let session_id = session.map(SessionId::from).unwrap_or_else(SessionId::generate);
    let rt = gateway.send(&message, &session_id).await?;
    let source = match rt.source {
        Source::Live => "live".to_string(),
        Source::Fallback(kind) => format!("fallback:{}", kind.as_str()),
    };
    let out = serde_json::json!({
        "sessionId": session_id,
        "source": source,
        "messages": rt.log,
        "isComplete": rt.is_complete(),
        "profile": rt.profile(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

/// Read one trimmed line; `None` on EOF.
fn prompt_line(prompt: &str) -> io::Result<Option<String>> {
    let mut stdout = io::stdout();
    write!(stdout, "{}", prompt)?;
    stdout.flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn print_landing() {
    println!();
    println!("PersonaAgent");
    println!("Discover your personality type through a short conversation with an AI agent.");
    println!();
}

/// Print the agent lines that answer the latest user turn.
fn print_replies(log: &[TurnMessage]) {
    let start = log.iter().rposition(|m| m.is_user()).map_or(0, |i| i + 1);
    for m in &log[start..] {
        println!("agent> {}", m.text);
    }
}

async fn run_turn(
    driver: &mut ConversationDriver,
    gateway: &AgentGateway<HttpTransport>,
    dispatch: Dispatch,
) {
    println!("...");
    driver.run_turn(gateway, dispatch).await;
    print_replies(driver.log());
    if let Some(notice) = driver.take_notice() {
        eprintln!("{}: {}", notice.title, notice.description);
    }
    if driver.is_degraded() {
        println!("(offline demo mode: the agent could not be reached)");
    }
}

async fn run_chat(config_path: Option<PathBuf>, url: Option<String>) -> anyhow::Result<()> {
    let gateway = build_gateway(config_path, url)?;
    let mut screen = Screen::Landing;
    let mut greeting: Option<Dispatch> = None;

    loop {
        screen = match screen {
            Screen::Landing => {
                print_landing();
                match prompt_line("Press Enter to start the test (or /quit): ")? {
                    None => break,
                    Some(s) if s.eq_ignore_ascii_case("/quit") => break,
                    Some(_) => {
                        let (next, dispatch) = Screen::activate(Route::Chat, None);
                        greeting = dispatch;
                        next
                    }
                }
            }
            Screen::Chat(driver) => match chat_loop(driver, greeting.take(), &gateway).await? {
                Some(next) => next,
                None => break,
            },
            Screen::Results(profile) => {
                println!();
                print!("{}", ResultsView::from_profile(&profile).to_text());
                println!();
                match prompt_line("Start again? [y/N] ")? {
                    Some(s) if s.eq_ignore_ascii_case("y") || s.eq_ignore_ascii_case("yes") => {
                        Screen::activate(Route::Landing, None).0
                    }
                    _ => break,
                }
            }
        };
    }

    Ok(())
}

/// Run the chat screen. Returns the next screen, or `None` when the user quits.
async fn chat_loop(
    mut driver: ConversationDriver,
    greeting: Option<Dispatch>,
    gateway: &AgentGateway<HttpTransport>,
) -> anyhow::Result<Option<Screen>> {
    log::debug!("chat session {}", driver.session_id());
    if let Some(dispatch) = greeting {
        run_turn(&mut driver, gateway, dispatch).await;
    }

    loop {
        if driver.is_complete() {
            println!("Analysis complete. Type /results to view your results.");
        }
        let Some(line) = prompt_line("> ")? else {
            return Ok(None);
        };
        if line.eq_ignore_ascii_case("/quit") || line.eq_ignore_ascii_case("/exit") {
            return Ok(None);
        }
        if line.eq_ignore_ascii_case("/results") {
            match driver.confirm() {
                Ok(handoff) => return Ok(Some(Screen::activate(Route::Results, Some(handoff)).0)),
                Err(d) => {
                    println!("The analysis is not complete yet.");
                    driver = d;
                    continue;
                }
            }
        }
        if driver.is_complete() {
            continue;
        }
        *driver.input_mut() = line;
        if let Some(dispatch) = driver.submit() {
            run_turn(&mut driver, gateway, dispatch).await;
        }
    }
}
