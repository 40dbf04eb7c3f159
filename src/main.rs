//! taskboard
//!
//! Kanban boards over SQLite, driven from the command line or a JSON HTTP API.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use serde::Serialize;
use std::fs::OpenOptions;
use std::sync::Arc;
use taskboard::api::{ApiServer, start_server};
use taskboard::board::{BoardController, BoardDirectory};
use taskboard::cli::{Cli, Command, TagCommand};
use taskboard::config::{Config, ConfigLoader};
use taskboard::db::Database;
use taskboard::format::{
    OutputFormat, format_board_markdown, format_boards_markdown, format_tags_markdown,
};
use taskboard::gateway::PersistenceGateway;
use taskboard::notify::Notification;
use taskboard::reorder::{DragItem, DragOutcome};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on --log option
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    match cli.log.as_str() {
        "0" | "off" => {}
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    let mut loader = ConfigLoader::load(cli.config.as_deref().map(std::path::Path::new))?;
    if let Some(path) = loader.config_path() {
        info!(path = %path.display(), "Using config file");
    }

    let config = loader.config_mut();
    if let Some(db_path) = &cli.database {
        config.server.db_path = db_path.into();
    }
    if let Command::Serve { port: Some(port) } = cli.command {
        config.server.port = port;
    }
    let config = loader.into_config();

    let db = open_database(&config)?;
    let gateway: Arc<dyn PersistenceGateway> = Arc::new(db);

    match cli.command {
        Command::Serve { .. } => run_server(&config, gateway).await,
        Command::Boards { owner, format } => {
            let owner = owner.unwrap_or_else(|| config.board.default_owner.clone());
            let boards = directory(&config, gateway).list_boards(&owner).await?;
            print_output(parse_format(&format)?, &boards, || {
                format_boards_markdown(&boards)
            })
        }
        Command::CreateBoard { title, owner } => {
            let owner = owner.unwrap_or_else(|| config.board.default_owner.clone());
            let board = directory(&config, gateway)
                .create_board(&owner, &title)
                .await?;
            println!("{}", board.id);
            Ok(())
        }
        Command::Show { board, format } => {
            let controller = BoardController::open(gateway, board).await?;
            let state = controller
                .state()
                .ok_or_else(|| anyhow!("board did not load"))?;
            print_output(parse_format(&format)?, state, || {
                format_board_markdown(state)
            })
        }
        Command::AddColumn { board, title } => {
            let mut controller = BoardController::open(gateway, board).await?;
            let column = controller.add_column(&title).await?;
            report(&mut controller);
            println!("{}", column.id);
            Ok(())
        }
        Command::AddTask {
            board,
            column,
            title,
            description,
        } => {
            let mut controller = BoardController::open(gateway, board).await?;
            let task = controller.add_task(&column, &title).await?;
            if let Some(description) = description.as_deref() {
                controller
                    .update_task(&task.id, &task.title, Some(description))
                    .await?;
            }
            report(&mut controller);
            println!("{}", task.id);
            Ok(())
        }
        Command::MoveColumn {
            board,
            column,
            over,
        } => {
            let controller = BoardController::open(gateway, board).await?;
            run_drag(controller, DragItem::column(column), DragItem::column(over)).await
        }
        Command::MoveTask { board, task, over } => {
            let controller = BoardController::open(gateway, board).await?;
            let target = match controller.state() {
                Some(state) if state.column(&over).is_some() => DragItem::column(over),
                _ => DragItem::task(over),
            };
            run_drag(controller, DragItem::task(task), target).await
        }
        Command::Tag(command) => run_tag(&config, gateway, command).await,
    }
}

fn open_database(config: &Config) -> Result<Database> {
    let db_path = &config.server.db_path;
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating database directory {}", parent.display()))?;
    }
    Database::open(db_path).with_context(|| format!("opening database {}", db_path.display()))
}

fn directory(config: &Config, gateway: Arc<dyn PersistenceGateway>) -> BoardDirectory {
    BoardDirectory::new(gateway, config.board.default_columns.clone())
}

fn parse_format(format: &str) -> Result<OutputFormat> {
    OutputFormat::from_str(format)
        .ok_or_else(|| anyhow!("unknown format '{}': expected markdown or json", format))
}

fn print_output<T: Serialize>(
    format: OutputFormat,
    value: &T,
    markdown: impl FnOnce() -> String,
) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Markdown => print!("{}", markdown()),
    }
    Ok(())
}

/// Print pending notifications to stderr.
fn report(controller: &mut BoardController) -> Vec<Notification> {
    let notifications = controller.take_notifications();
    for notification in &notifications {
        let marker = if notification.is_failure() { "!" } else { "-" };
        eprintln!("{} {}", marker, notification.message);
    }
    notifications
}

/// Drive a full drag gesture: start on `item`, hover and drop on `over`.
async fn run_drag(mut controller: BoardController, item: DragItem, over: DragItem) -> Result<()> {
    controller.drag_start(item)?;
    controller.drag_over(&over);
    let outcome = controller.drag_end(Some(over)).await?;

    let notifications = report(&mut controller);
    match outcome {
        DragOutcome::NoOp | DragOutcome::Cancelled => println!("nothing to move"),
        _ => println!("{}", serde_json::to_string(&outcome)?),
    }

    if notifications.iter().any(Notification::is_failure) {
        return Err(anyhow!("move was not saved; the board was reloaded"));
    }
    Ok(())
}

async fn run_tag(
    config: &Config,
    gateway: Arc<dyn PersistenceGateway>,
    command: TagCommand,
) -> Result<()> {
    let directory = directory(config, Arc::clone(&gateway));
    match command {
        TagCommand::Create { name, color } => {
            let tag = directory.create_tag(&name, &color).await?;
            println!("{}", tag.id);
        }
        TagCommand::List => {
            let tags = directory.list_tags().await?;
            print!("{}", format_tags_markdown(&tags));
        }
        TagCommand::Attach { board, task, tag } => {
            let tag = directory.find_tag(&tag).await?;
            let mut controller = BoardController::open(gateway, board).await?;
            controller.attach_tag(&task, &tag.id).await?;
            report(&mut controller);
        }
        TagCommand::Detach { board, task, tag } => {
            let tag = directory.find_tag(&tag).await?;
            let mut controller = BoardController::open(gateway, board).await?;
            controller.detach_tag(&task, &tag.id).await?;
            report(&mut controller);
        }
    }
    Ok(())
}

async fn run_server(config: &Config, gateway: Arc<dyn PersistenceGateway>) -> Result<()> {
    let server = ApiServer::new(
        gateway,
        config.board.default_owner.clone(),
        config.board.default_columns.clone(),
    );
    let (shutdown_tx, addr) = start_server(server, config.server.port).await?;
    info!(db = %config.server.db_path.display(), "Serving boards on http://{}", addr);

    tokio::signal::ctrl_c().await?;
    info!("Received interrupt, shutting down");
    let _ = shutdown_tx.send(());
    Ok(())
}
