use std::collections::HashMap;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use persona_chorus::{
    config::{Config, LogFormat},
    CannedGenerator, ChatSession, ConversationEvent, DiscussionMode, Message, MessageKind,
    Orchestrator, PersonalityRegistry, TurnSummary,
};

/// Run one multi-persona discussion turn in the terminal.
#[derive(Parser, Debug)]
#[command(name = "persona-chorus", version, about)]
struct Cli {
    /// Prompt to discuss
    #[arg(long, short)]
    prompt: Option<String>,

    /// Discussion mode (collaborative, brainstorm, debate, devils-advocate, socratic, consensus)
    #[arg(long)]
    mode: Option<DiscussionMode>,

    /// Complexity from 1 to 10; higher stretches the pauses between answers
    #[arg(long)]
    complexity: Option<u8>,

    /// Comma-separated persona ids to include (default: all)
    #[arg(long, value_delimiter = ',')]
    participants: Vec<String>,

    /// Seed for reproducible scheduling and canned text
    #[arg(long)]
    seed: Option<u64>,

    /// Skip thinking placeholders
    #[arg(long)]
    no_thinking: bool,

    /// Disable interruptions
    #[arg(long)]
    no_interruptions: bool,

    /// Disable sub-responses
    #[arg(long)]
    no_sub_responses: bool,

    /// Print events and the summary as JSON lines
    #[arg(long)]
    json: bool,

    /// List available personas and exit
    #[arg(long)]
    list_personas: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    let registry = Arc::new(PersonalityRegistry::new());
    if cli.list_personas {
        for p in registry.list() {
            println!(
                "{:<12} {:<6} {:<28} speed={:<6} interrupts={}",
                p.id,
                p.name,
                p.role,
                p.thinking_speed.as_str(),
                p.interruptiveness
            );
        }
        return Ok(());
    }

    let Some(prompt) = cli.prompt.clone() else {
        anyhow::bail!("--prompt is required unless --list-personas is given");
    };

    apply_overrides(&mut config, &cli);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        mode = %config.chat.mode,
        complexity = config.chat.complexity,
        "Persona chorus starting..."
    );

    let generator = match config.chat.seed {
        Some(seed) => CannedGenerator::with_seed(seed),
        None => CannedGenerator::new(),
    };
    let orchestrator = match config.chat.seed {
        Some(seed) => Orchestrator::with_seed(
            registry.clone(),
            Arc::new(generator),
            config.timing.clone(),
            seed,
        ),
        None => Orchestrator::new(registry.clone(), Arc::new(generator), config.timing.clone()),
    };

    let mut session = ChatSession::from_config(orchestrator, &config.chat);
    if !cli.participants.is_empty() {
        select_participants(&session, &cli.participants)?;
    }

    let names: HashMap<String, String> = session
        .participants()
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect();

    let handle = match session.submit(&prompt) {
        Ok(h) => h,
        Err(e) => {
            error!(error = %e, "Turn rejected");
            return Err(e.into());
        }
    };

    let mut join = Box::pin(handle.join());
    let summary = loop {
        tokio::select! {
            result = &mut join => break result?,
            Some(event) = session.next_event() => print_event(&event, &names, cli.json)?,
        }
    };
    while let Some(event) = session.poll_event() {
        print_event(&event, &names, cli.json)?;
    }

    print_result(&session, &summary, &names, cli.json)?;
    info!(turn = summary.turn, messages = summary.settled_messages(), "Discussion complete");
    Ok(())
}

/// Command-line flags win over environment configuration.
fn apply_overrides(config: &mut Config, cli: &Cli) {
    let chat = &mut config.chat;
    if let Some(mode) = cli.mode {
        chat.mode = mode;
    }
    if let Some(complexity) = cli.complexity {
        chat.complexity = complexity.clamp(1, 10);
    }
    if cli.seed.is_some() {
        chat.seed = cli.seed;
    }
    if cli.no_thinking {
        chat.settings.show_thinking = false;
    }
    if cli.no_interruptions {
        chat.settings.allow_interruptions = false;
    }
    if cli.no_sub_responses {
        chat.settings.allow_sub_responses = false;
    }
}

fn select_participants(session: &ChatSession, wanted: &[String]) -> anyhow::Result<()> {
    let roster = session.participants();
    for id in wanted {
        if !roster.iter().any(|p| &p.id == id) {
            anyhow::bail!("Unknown persona: {}", id);
        }
    }
    for participant in roster {
        if !wanted.contains(&participant.id) {
            session
                .orchestrator()
                .set_participant_enabled(&participant.id, false)?;
        }
    }
    Ok(())
}

fn display_name<'a>(names: &'a HashMap<String, String>, id: &'a str) -> &'a str {
    names.get(id).map(String::as_str).unwrap_or(id)
}

fn print_event(
    event: &ConversationEvent,
    names: &HashMap<String, String>,
    json: bool,
) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }
    let ConversationEvent::Message(message) = event else {
        return Ok(());
    };
    println!("{}", render_line(message, names));
    Ok(())
}

fn render_line(message: &Message, names: &HashMap<String, String>) -> String {
    let name = display_name(names, &message.participant_id);
    match message.kind {
        MessageKind::Thinking => format!(
            "  ... {} is thinking: {}",
            name,
            message.reasoning.as_deref().unwrap_or_default()
        ),
        MessageKind::Message => format!("{}: {}", name, message.content),
        MessageKind::Interruption => format!("{} (interrupting): {}", name, message.content),
        MessageKind::SubResponse => format!("{} (aside): {}", name, message.content),
        MessageKind::FollowUpReaction => format!("{} (following up): {}", name, message.content),
    }
}

fn print_result(
    session: &ChatSession,
    summary: &TurnSummary,
    names: &HashMap<String, String>,
    json: bool,
) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(summary)?);
        return Ok(());
    }

    println!("\nThread");
    println!("══════════════════════════════════════════════════════════════");
    for node in session.tree().walk() {
        if node.message.is_thinking() {
            continue;
        }
        println!("{}{}", "    ".repeat(node.depth), render_line(&node.message, names));
    }
    println!(
        "\n{} responses, {} interruptions, {} sub-responses ({} pending approval), {} follow-ups",
        summary.responses,
        summary.interruptions,
        summary.sub_responses,
        session.pending_sub_responses().len(),
        summary.follow_ups
    );
    Ok(())
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
