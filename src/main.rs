use clap::Parser;
use page_agent::config::SettingsProvider;
use page_agent::session::Role;
use page_agent::utils::{normalize_url, script_preview};
use page_agent::{Agent, AgentError, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};

mod args;
use args::{Args, Command};

const PREVIEW_LINES: usize = 12;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    // Parse command-line arguments
    let args = Args::parse();

    let mut agent = Agent::new().with_settings_file(args.settings);
    if let Some(path) = &args.config {
        agent = match agent.with_config_file(path) {
            Ok(agent) => agent,
            Err(e) => {
                ::log::error!("Failed to load configuration: {}", e);
                eprintln!("error: {}", e);
                std::process::exit(2);
            }
        };
    }
    if let Some(url) = args.webdriver {
        agent = agent.with_webdriver_url(url);
    }

    let result = match args.command {
        Command::Chat { url } => chat(&agent, &url).await,
        Command::Snapshot {
            url,
            file,
            base_url,
        } => match (url, file) {
            (_, Some(file)) => snapshot_file(&agent, &file, base_url.as_deref()),
            (Some(url), None) => snapshot_url(&agent, &url).await,
            (None, None) => Err(AgentError::Configuration(
                "give a URL or --file".to_string(),
            )),
        },
        Command::Models { select } => models(&agent, select).await,
    };

    if let Err(e) = result {
        ::log::error!("{} error: {}", e.kind(), e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn parse_target_url(input: &str) -> Result<String> {
    normalize_url(input).ok_or_else(|| AgentError::Configuration(format!("not a URL: {}", input)))
}

async fn chat(agent: &Agent, input: &str) -> Result<()> {
    let url = parse_target_url(input)?;
    println!("Note: chatting requires a WebDriver server (e.g., ChromeDriver).");
    println!("Set WEBDRIVER_URL if not using {}", agent.config().webdriver_url);

    let mut session = agent.open(&url).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut shown = 0;
    println!("Opened {}. Ask about the page, or /quit to leave.", url);

    loop {
        let Some(line) = prompt(&mut lines, "> ").await else {
            break;
        };
        if line.trim() == "/quit" {
            break;
        }

        session.send(&line).await;
        shown = print_new_entries(session.log(), shown);

        if let Some(script) = session.pending_script() {
            println!("\nSuggested script:\n{}\n", script_preview(&script.code, PREVIEW_LINES));
            let answer = prompt(&mut lines, "Run it? [y/N] ").await.unwrap_or_default();
            if answer.trim().eq_ignore_ascii_case("y") {
                session.execute_pending().await;
                shown = print_new_entries(session.log(), shown);
            }
        }
    }

    if let Err(e) = session.orchestrator().transport().close().await {
        ::log::warn!("Failed to close WebDriver session: {}", e);
    }
    Ok(())
}

async fn prompt(lines: &mut Lines<BufReader<Stdin>>, text: &str) -> Option<String> {
    let mut stdout = tokio::io::stdout();
    // A failed flush only delays the prompt
    let _ = stdout.write_all(text.as_bytes()).await;
    let _ = stdout.flush().await;
    match lines.next_line().await {
        Ok(line) => line,
        Err(e) => {
            ::log::error!("Failed to read input: {}", e);
            None
        }
    }
}

fn print_new_entries(log: &[page_agent::session::LogEntry], shown: usize) -> usize {
    for entry in &log[shown..] {
        match entry.role {
            Role::User => {}
            Role::Error => eprintln!("{}", entry),
            _ => println!("{}", entry),
        }
    }
    log.len()
}

fn snapshot_file(agent: &Agent, path: &std::path::Path, base_url: Option<&str>) -> Result<()> {
    let html = std::fs::read_to_string(path)
        .map_err(|e| AgentError::Configuration(format!("cannot read {}: {}", path.display(), e)))?;
    let snapshot = agent.snapshot_html(&html, base_url);
    print_json(&snapshot)
}

async fn snapshot_url(agent: &Agent, input: &str) -> Result<()> {
    let url = parse_target_url(input)?;
    let snapshot = agent.snapshot_url(&url).await?;
    print_json(&snapshot)
}

fn print_json(snapshot: &page_agent::PageSnapshot) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot)
        .map_err(|e| AgentError::Service(format!("cannot serialize snapshot: {}", e)))?;
    println!("{}", json);
    Ok(())
}

async fn models(agent: &Agent, select: Option<String>) -> Result<()> {
    let client = agent.generation_client();
    let models = client.list_models().await?;

    if let Some(model) = select {
        if !models.contains(&model) {
            ::log::warn!("{} is not in the listed models, storing it anyway", model);
        }
        let settings = client.settings();
        let mut stored = settings.load()?;
        stored.model = model;
        settings.save(&stored)?;
        println!("Using {}", stored.model);
        return Ok(());
    }

    let current = client.settings().load()?.model;
    for model in models {
        let marker = if model == current { "*" } else { " " };
        println!("{} {}", marker, model);
    }
    Ok(())
}
