use std::{
    io::{
        self,
        BufRead,
        Write,
    },
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use clap::{
    Parser,
    Subcommand,
};
use serde::Deserialize;
use tokio::{
    io::{
        AsyncBufReadExt,
        BufReader,
    },
    sync::mpsc,
};
use tracing::{
    error,
    info,
    warn,
};
use tracing_subscriber::EnvFilter;
use wk_companion::{
    anki::{
        self,
        AnkiClient,
        NoteBridge,
    },
    core::{
        http::http_client,
        CompanionError,
        SessionMode,
    },
    immersion::{
        ExampleLookup,
        ImmersionKitClient,
    },
    persistence,
    render::{
        Presenter,
        PresenterUpdate,
    },
    review::{
        api::WANIKANI_API_URL,
        JsonKeyStore,
        KeyPrompt,
        ReviewApi,
        ReviewMover,
        WaniKaniClient,
    },
    session::{
        AutoplayController,
        MemoryStore,
        SessionDeps,
        StoreEvent,
    },
    Settings,
};

#[derive(Parser, Debug)]
#[command(name = "wk-companion", about = "Sentence autoplay and lesson helper for WaniKani", version)]
struct Cli {
    /// Settings file; defaults to settings.json in the app data dir.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reads store updates (`{"key": ..., "value": ...}` per line) from stdin and
    /// prints presenter updates as JSON lines.
    Autoplay {
        /// Page URL, used to detect the session mode.
        #[arg(long, default_value = "https://www.wanikani.com/review/session")]
        url: String,

        /// Attempts to reach AnkiConnect before starting.
        #[arg(long, default_value_t = 1)]
        anki_attempts: u32,
    },
    /// Shows whether a subject's lesson can be started, and starts it on request.
    MoveToReview {
        subject_id: u64,

        #[arg(long, default_value = WANIKANI_API_URL)]
        api_url: String,
    },
}

#[derive(Debug, Deserialize)]
struct StoreLine {
    key: String,
    value: serde_json::Value,
}

struct StdoutPresenter;

impl Presenter for StdoutPresenter {
    fn present(&self, update: PresenterUpdate) {
        match serde_json::to_string(&update) {
            Ok(line) => println!("{line}"),
            Err(e) => error!("Could not serialize presenter update: {}", e),
        }
    }

    fn reload(&self) {
        println!("{}", serde_json::json!({ "update": "reload" }));
    }
}

struct TerminalPrompt;

/// Asks on the terminal. Runs inside the multi-threaded runtime, so the wait
/// is moved off the async worker with `block_in_place`.
fn read_line(question: &str) -> Option<String> {
    tokio::task::block_in_place(|| {
        print!("{question} ");
        io::stdout().flush().ok()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line).ok()?;
        Some(line.trim().to_string())
    })
}

impl KeyPrompt for TerminalPrompt {
    fn confirm_reentry(&self, status: u16, status_text: &str) -> bool {
        let answer = read_line(&format!(
            "WK API answered : {status} {status_text}\nDo you want to enter a different API key? [y/N]"
        ));
        matches!(answer.as_deref(), Some("y" | "Y" | "yes"))
    }

    fn request_key(&self) -> Option<String> {
        read_line("Please enter an API key with 'assignment start' permission:")
            .filter(|k| !k.is_empty())
    }
}

fn load_settings(path: Option<&PathBuf>) -> Settings {
    match path {
        Some(path) => persistence::load_json_at(path).unwrap_or_else(|e| {
            warn!("Failed to load {}: {}. Using defaults.", path.display(), e);
            Settings::default()
        }),
        None => Settings::load(),
    }
}

async fn run_autoplay(
    settings: Settings,
    url: &str,
    anki_attempts: u32,
) -> Result<(), CompanionError> {
    let mode = SessionMode::from_url(url)
        .ok_or_else(|| CompanionError::Custom(format!("No session mode for {url}")))?;
    let client = http_client()?;

    let mut bridge: Option<Arc<dyn NoteBridge>> = None;
    if let Some(anki_settings) = &settings.anki {
        let anki_client = AnkiClient::new(client.clone(), anki_settings.endpoint.clone());
        if anki::wait_awake(&anki_client, Duration::from_secs(2), anki_attempts).await {
            bridge = Some(Arc::new(anki_client));
        } else {
            warn!("AnkiConnect unreachable; continuing with ImmersionKit only");
        }
    }

    let lookup = settings.immersion_kit.as_ref().map(|s| -> Arc<dyn ExampleLookup> {
        Arc::new(ImmersionKitClient::new(client.clone(), s.endpoint.clone()))
    });

    let store = Arc::new(MemoryStore::new());
    let deps = SessionDeps {
        store: store.clone(),
        bridge,
        lookup,
        presenter: Arc::new(StdoutPresenter),
        settings: Arc::new(settings),
    };

    let (tx, rx) = mpsc::channel(32);
    let controller = tokio::spawn(AutoplayController::new(deps, mode).run(rx));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let update: StoreLine = match serde_json::from_str(&line) {
            Ok(update) => update,
            Err(e) => {
                warn!("Ignoring malformed store line: {}", e);
                continue;
            }
        };

        store.set(update.key.clone(), update.value);
        if tx.send(StoreEvent::new(update.key)).await.is_err() {
            break;
        }
    }

    drop(tx);
    controller.await.map_err(|e| CompanionError::Custom(format!("controller task failed: {e}")))
}

async fn run_move_to_review(subject_id: u64, api_url: &str) -> Result<(), CompanionError> {
    let transport = Arc::new(WaniKaniClient::new(http_client()?, api_url));
    let api = ReviewApi::new(transport, Arc::new(JsonKeyStore::in_app_data()), Arc::new(TerminalPrompt));
    let mover = ReviewMover::new(api);
    let presenter = StdoutPresenter;

    mover.present_subject(subject_id, &presenter).await?;
    let Some(button) = mover.button() else {
        info!("Subject {} has no lesson available to start", subject_id);
        return Ok(());
    };

    let answer = read_line(&format!("{}? [y/N]", button.label));
    if matches!(answer.as_deref(), Some("y" | "Y" | "yes")) {
        mover.click(&presenter).await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = load_settings(cli.settings.as_ref());

    let result = match cli.command {
        Command::Autoplay { url, anki_attempts } => {
            run_autoplay(settings, &url, anki_attempts).await
        }
        Command::MoveToReview { subject_id, api_url } => {
            run_move_to_review(subject_id, &api_url).await
        }
    };

    if let Err(err) = result {
        error!("{err}");
        std::process::exit(1);
    }
}
