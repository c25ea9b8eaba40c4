use clap::{CommandFactory, Parser};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use todo_cli::cli::{Cli, Command, LiveCli, LiveCommand, collect_overrides, split_command_line};
use todo_sync::config::{Config, load_config_with_fallback, merge_overrides};
use todo_sync::controller::{SyncController, TaskView};
use todo_sync::error::AppError;
use todo_sync::format::format_duration;
use todo_sync::model::{Task, parse_duration};
use todo_sync::remote::HttpTaskStore;
use todo_sync::session::{Action, Session};
use todo_sync::storage::SnapshotStore;
use todo_sync::storage::snapshot_store::snapshot_path;
use tokio::sync::{mpsc, watch};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_ENV_VAR: &str = "TODO_TIMER_LOG";

#[derive(Tabled)]
struct TaskRow {
    id: String,
    title: String,
    remaining: String,
    status: &'static str,
}

fn status_label(task: &Task) -> &'static str {
    if task.done { "done" } else { "pending" }
}

fn task_json(task: &Task) -> serde_json::Value {
    serde_json::json!({
        "id": task.id,
        "title": task.title,
        "time": task.time,
        "done": task.done,
        "remaining": format_duration(task.time),
    })
}

fn print_tasks(tasks: &[Task], json: bool) {
    if json {
        let payload: Vec<_> = tasks.iter().map(task_json).collect();
        println!("{}", serde_json::Value::Array(payload));
        return;
    }

    if tasks.is_empty() {
        println!("there are no tasks");
        return;
    }

    let rows = tasks.iter().map(|task| TaskRow {
        id: task.id.clone(),
        title: task.title.clone(),
        remaining: format_duration(task.time),
        status: status_label(task),
    });
    let mut table = Table::new(rows);
    table.with(Style::psql());
    println!("{table}");
}

fn print_task(verb: &str, task: &Task, json: bool) {
    if json {
        println!("{}", task_json(task));
    } else {
        println!("{verb} task: {} ({})", task.title, task.id);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn resolve_config(raw_overrides: &[String]) -> Result<Config, AppError> {
    let loaded = load_config_with_fallback();
    if let Some(err) = loaded.error {
        tracing::warn!(error = %err, "using default configuration");
    }
    let overrides = collect_overrides(raw_overrides).map_err(AppError::invalid_input)?;
    Ok(merge_overrides(&loaded.config, &overrides))
}

fn build_controller(config: &Config) -> Result<SyncController<HttpTaskStore>, AppError> {
    let remote = HttpTaskStore::new(&config.api_url(), config.timeout())?;
    let snapshots = SnapshotStore::new(snapshot_path(config.snapshot_path.as_deref())?);
    Ok(SyncController::new(remote, snapshots).with_startup(config.startup()))
}

async fn run_command(cli: Cli) -> Result<(), AppError> {
    let config = resolve_config(&cli.config_override)?;
    let mut controller = build_controller(&config)?;

    match cli.command {
        Command::Add { title, seconds } => {
            let time = parse_duration(&seconds)?;
            controller.initial_load().await?;
            let task = controller.create(&title, time).await?;
            controller.persist();
            print_task("Added", &task, cli.json);
        }
        Command::Done { id } => {
            controller.initial_load().await?;
            let task = controller.toggle(&id).await?;
            controller.persist();
            let verb = if task.done { "Completed" } else { "Reopened" };
            print_task(verb, &task, cli.json);
        }
        Command::Delete { id } => {
            controller.initial_load().await?;
            let removed = controller.delete(&id).await?;
            controller.persist();
            match removed {
                Some(task) => print_task("Deleted", &task, cli.json),
                None if cli.json => println!("{}", serde_json::json!({ "id": id })),
                None => println!("Deleted task: {id}"),
            }
        }
        Command::List => {
            controller.initial_load().await?;
            print_tasks(controller.tasks(), cli.json);
        }
        Command::Run => run_live(controller, cli.json).await?,
    }

    Ok(())
}

enum LiveInput {
    Action(Action),
    List,
    Help,
    Quit,
    Skip,
}

fn parse_live_line(line: &str) -> Result<LiveInput, AppError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(LiveInput::Skip);
    }
    if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
        return Ok(LiveInput::Quit);
    }
    if line == "help" || line == "?" {
        return Ok(LiveInput::Help);
    }

    let args = split_command_line(line).map_err(AppError::invalid_input)?;
    let parsed = LiveCli::try_parse_from(args).map_err(normalize_parse_error)?;
    Ok(match parsed.command {
        LiveCommand::Add { title, seconds } => LiveInput::Action(Action::Create {
            title,
            time: parse_duration(&seconds)?,
        }),
        LiveCommand::Done { id } => LiveInput::Action(Action::Toggle { id }),
        LiveCommand::Delete { id } => LiveInput::Action(Action::Delete { id }),
        LiveCommand::List => LiveInput::List,
    })
}

// Stdin is read on a plain thread so a pending read never holds up shutdown.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (lines, receiver) = mpsc::channel(16);
    std::thread::spawn(move || {
        use std::io::BufRead;
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if lines.blocking_send(line).is_err() {
                break;
            }
        }
    });
    receiver
}

async fn run_live(controller: SyncController<HttpTaskStore>, json: bool) -> Result<(), AppError> {
    let (actions, receiver) = mpsc::channel(16);
    let (views, mut watcher) = watch::channel(TaskView::default());
    let session = tokio::spawn(Session::new(controller).run(receiver, views));
    let mut lines = spawn_stdin_reader();
    let mut shown_error: Option<AppError> = None;

    loop {
        tokio::select! {
            changed = watcher.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = watcher.borrow_and_update().clone();
                if view.loading {
                    println!("Loading...");
                    continue;
                }
                if view.last_error != shown_error {
                    if let Some(err) = view.last_error.as_ref() {
                        eprintln!("ERROR: {err}");
                    }
                    shown_error = view.last_error.clone();
                }
                print_tasks(&view.tasks, json);
            }
            line = lines.recv() => {
                let Some(line) = line else { break };
                match parse_live_line(&line) {
                    Ok(LiveInput::Action(action)) => {
                        if actions.send(action).await.is_err() {
                            break;
                        }
                    }
                    Ok(LiveInput::List) => print_tasks(&watcher.borrow().tasks, json),
                    Ok(LiveInput::Help) => {
                        let mut cmd = LiveCli::command();
                        println!("{}", cmd.render_help());
                    }
                    Ok(LiveInput::Quit) => break,
                    Ok(LiveInput::Skip) => {}
                    Err(err) => eprintln!("ERROR: {err}"),
                }
            }
        }
    }

    actions.send(Action::Shutdown).await.ok();
    drop(actions);
    session
        .await
        .map_err(|err| AppError::io(err.to_string()))?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => {
            let _ = err.print();
            return;
        }
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    if let Err(err) = run_command(cli).await {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
