mod cli;

use std::sync::Arc;

use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use cli::{Command, Invocation};
use reminder_bridge::access::ApiKeyGuard;
use reminder_bridge::calendar::memory::MemoryStore;
use reminder_bridge::calendar::native::NativeStore;
use reminder_bridge::calendar::{
    AuthorizationStatus, ReminderListCreate, ReminderListUpdate, ReminderStore, ReminderUpdate,
};
use reminder_bridge::config::{Backend, Config};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let config = Config::load()?;
    setup_logging(&config);

    let invocation = match cli::parse_args(std::env::args().skip(1)) {
        Ok(invocation) => invocation,
        Err(message) => {
            eprintln!("{message}\n\n{}", cli::USAGE);
            std::process::exit(2);
        }
    };
    if invocation.command == Command::Help {
        println!("{}", cli::USAGE);
        return Ok(());
    }

    ApiKeyGuard::new(config.api_key.clone()).verify(invocation.api_key.as_deref())?;

    match config.backend {
        Backend::Memory => {
            let native = MemoryStore::with_local_source(config.memory_time_zone());
            run(native, &config, invocation).await
        }
        #[cfg(target_os = "macos")]
        Backend::Eventkit => {
            let native = reminder_bridge::calendar::eventkit::EventKitStore::new();
            run(native, &config, invocation).await
        }
        #[cfg(not(target_os = "macos"))]
        Backend::Eventkit => Err(eyre!("The eventkit backend is only available on macOS")),
    }
}

fn setup_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run<N: NativeStore + 'static>(native: N, config: &Config, invocation: Invocation) -> Result<()> {
    let mut store = ReminderStore::new(native);
    if let Some(timeout) = config.bridge_timeout() {
        store = store.with_timeout(timeout);
    }
    let store = Arc::new(store);

    let status = store.authorization_status();
    tracing::info!(%status, "reminder-bridge started");
    if status == AuthorizationStatus::NotDetermined
        && config.request_access_on_startup
        && invocation.command != Command::RequestAccess
    {
        let granted = store.clone().request_access_async().await?;
        tracing::info!(granted, "requested reminders access on startup");
    }

    match invocation.command {
        Command::Status => print_json(&store.authorization_status()),
        Command::RequestAccess => {
            let granted = store.clone().request_access_async().await?;
            print_json(&serde_json::json!({
                "granted": granted,
                "status": store.authorization_status(),
            }))
        }
        Command::Lists => print_json(&store.list_reminder_lists()?),
        Command::List { id } => {
            let list = store
                .get_reminder_list(&id)?
                .ok_or_else(|| eyre!("Reminder list {id} not found"))?;
            print_json(&list)
        }
        Command::CreateList {
            title,
            source_id,
            color,
        } => {
            let mut create = ReminderListCreate::new(title, source_id);
            create.color = color;
            print_json(&store.create_reminder_list(&create)?)
        }
        Command::RenameList { id, title } => {
            let update = ReminderListUpdate {
                title: Some(title),
                ..Default::default()
            };
            print_json(&store.update_reminder_list(&id, &update)?)
        }
        Command::Reminders { list_ids } => {
            print_json(&store.clone().list_reminders_in_lists_async(list_ids).await?)
        }
        Command::Reminder { id } => {
            let reminder = store
                .get_reminder(&id)?
                .ok_or_else(|| eyre!("Reminder {id} not found"))?;
            print_json(&reminder)
        }
        Command::CreateReminder { list_id, create } => {
            print_json(&store.create_reminder(&list_id, &create)?)
        }
        Command::Complete { id } => {
            let update = ReminderUpdate {
                is_completed: Some(true),
                ..Default::default()
            };
            print_json(&store.update_reminder(&id, &update)?)
        }
        Command::Help => {
            println!("{}", cli::USAGE);
            Ok(())
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
