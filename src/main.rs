use clap::Parser;
use ratatui::DefaultTerminal;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

mod api;
mod browser;
mod config;
mod controller;
mod domain;
mod form;
mod inputter;
mod jobs;
mod logging;
mod model;
mod record;
mod store;
mod ui;

use api::{ApiClient, Session};
use config::{Args, FolioConfig, expand_path};
use controller::Controller;
use domain::FolioError;
use model::{Model, Status};
use store::{FileStore, MemoryStore, RecordStore};
use ui::TableUI;

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Err(e) => {
            error!("Exiting with {e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(args: &Args) -> Result<(), FolioError> {
    logging::init(&expand_path(&args.log_file))?;
    info!("Starting folio");

    let config = FolioConfig::from(args);
    let store = build_store(args, &config)?;
    let mut model = Model::init(&config, store);
    let ui = TableUI::new();
    let controller = Controller::new(&config);

    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, &mut model, &ui, &controller);
    ratatui::restore();
    result
}

fn event_loop(
    terminal: &mut DefaultTerminal,
    model: &mut Model,
    ui: &TableUI,
    controller: &Controller,
) -> Result<(), FolioError> {
    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(model, f))?;

        // A timeout still goes through update so finished jobs get applied
        let message = controller.handle_event(model)?;
        model.update(message)?;
    }
    Ok(())
}

fn build_store(args: &Args, config: &FolioConfig) -> Result<Arc<dyn RecordStore>, FolioError> {
    if args.demo {
        return Ok(Arc::new(MemoryStore::demo()));
    }
    if let Some(file) = &args.file {
        return Ok(Arc::new(FileStore::open(expand_path(file), config.collection)?));
    }

    let client = ApiClient::new(&args.api, config.request_timeout)?;
    let client = match (&args.token, &args.email, &args.password) {
        (Some(token), _, _) => client.with_session(Session::from_token(token.as_str())),
        (None, Some(email), Some(password)) => {
            let session = client.login(email, password)?;
            client.with_session(session)
        }
        _ => {
            info!("No credentials given, changes will be rejected");
            client
        }
    };
    Ok(Arc::new(client))
}
