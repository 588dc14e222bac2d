use crate::catalog;
use crate::chat::ChatSession;
use crate::cli::{Cli, Commands, DocsCommands};
use crate::config::Config;
use crate::error::{ConfigError, Result};
use crate::events::{event_bus, EventReceiver, ResearchEvent};
use crate::job::{
    JobManager, JobManagerDeps, JobStateStore, Modifiers, PollPhase, RequestParameters, Schedule,
    SqliteSlotStore,
};
use crate::remote::HttpApiClient;
use std::sync::Arc;
use std::time::Duration;

/// Route a parsed command to the subsystem that handles it.
pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Submit {
            capability,
            framework,
            context,
            scope,
            depth,
            rigor,
            perspective,
        } => {
            if !catalog::is_valid_pair(&capability, &framework) {
                return Err(ConfigError::Validation(format!(
                    "unknown capability/framework pair: {capability} / {framework}"
                ))
                .into());
            }

            let mut modifiers = catalog::default_modifiers(&framework);
            apply_overrides(&mut modifiers, scope, depth, rigor, perspective);

            let (mut manager, rx) = build_manager(&config);
            manager
                .submit(RequestParameters {
                    capability,
                    framework,
                    context,
                    modifiers,
                })
                .await?;
            drive_to_terminal(rx).await;
            Ok(())
        }

        Commands::Resume => {
            let (mut manager, rx) = build_manager(&config);
            match manager.resume() {
                Some(phase) => {
                    println!("Rejoined research job in {phase} phase.");
                    drive_to_terminal(rx).await;
                }
                None => println!("No research job to resume."),
            }
            Ok(())
        }

        Commands::Status => {
            let store = build_store(&config);
            match store.load() {
                Some((descriptor, elapsed)) => {
                    let phase = Schedule::new(&config.polling).phase_at(elapsed).kind();
                    println!(
                        "{} ({}) - {phase} phase, {}s elapsed",
                        descriptor.parameters.framework,
                        descriptor.parameters.context,
                        elapsed.as_secs()
                    );
                }
                None => println!("{}", PollPhase::Idle),
            }
            Ok(())
        }

        Commands::Cancel => {
            let store = build_store(&config);
            if store.load().is_some() {
                store.clear();
                println!("Research job cancelled.");
            } else {
                println!("No research job to cancel.");
            }
            Ok(())
        }

        Commands::Chat { document, question } => {
            let api = Arc::new(HttpApiClient::from_config(&config));
            let mut session = ChatSession::new(document, api, &config.polling);
            let reply = session.ask(&question).await;
            println!("{}", reply.content);
            Ok(())
        }

        Commands::Catalog => {
            for (capability, frameworks) in catalog::CAPABILITIES {
                println!("{capability}");
                for framework in *frameworks {
                    println!("  {framework}");
                    println!("    {}", catalog::context_hint(framework));
                }
            }
            Ok(())
        }

        Commands::Docs { command } => {
            let api = HttpApiClient::from_config(&config);
            match command {
                DocsCommands::List => {
                    use crate::remote::DocumentLibrary;
                    let documents = api.list().await?;
                    if documents.is_empty() {
                        println!("No documents in the library.");
                    }
                    for document in documents {
                        let created = document
                            .created_at
                            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                            .unwrap_or_default();
                        println!("{}  {}  {created}", document.id, document.name);
                    }
                }
                DocsCommands::Delete { id } => {
                    use crate::remote::DocumentLibrary;
                    api.delete(&id).await?;
                    println!("Deleted {id}.");
                }
            }
            Ok(())
        }
    }
}

fn apply_overrides(
    modifiers: &mut Modifiers,
    scope: Option<String>,
    depth: Option<String>,
    rigor: Option<String>,
    perspective: Option<String>,
) {
    if let Some(scope) = scope {
        modifiers.scope = scope;
    }
    if let Some(depth) = depth {
        modifiers.depth = depth;
    }
    if let Some(rigor) = rigor {
        modifiers.rigor = rigor;
    }
    if let Some(perspective) = perspective {
        modifiers.perspective = perspective;
    }
}

fn build_store(config: &Config) -> Arc<JobStateStore> {
    Arc::new(JobStateStore::new(
        Arc::new(SqliteSlotStore::new(&config.workspace_dir)),
        Duration::from_secs(config.polling.resume_expiry_secs),
    ))
}

fn build_manager(config: &Config) -> (JobManager, EventReceiver) {
    let api = Arc::new(HttpApiClient::from_config(config));
    let (events, rx) = event_bus(256);
    let deps = JobManagerDeps {
        execution: Arc::clone(&api) as Arc<dyn crate::remote::ExecutionService>,
        documents: api as Arc<dyn crate::remote::DocumentLibrary>,
        store: build_store(config),
    };
    (
        JobManager::new(deps, config.polling.clone(), events),
        rx,
    )
}

/// Print tracker events until a terminal one arrives.
async fn drive_to_terminal(mut rx: EventReceiver) {
    while let Ok(event) = rx.recv().await {
        render(&event);
        if matches!(
            event,
            ResearchEvent::Finished | ResearchEvent::Cancelled | ResearchEvent::Failed { .. }
        ) {
            break;
        }
    }
}

fn render(event: &ResearchEvent) {
    match event {
        ResearchEvent::Started { framework } => {
            println!("Research started: {framework}.");
        }
        ResearchEvent::CountdownTick { remaining_secs } => {
            // One line per minute, not per tick.
            if remaining_secs % 60 == 0 && *remaining_secs > 0 {
                println!("~{}m remaining...", remaining_secs / 60);
            }
        }
        ResearchEvent::PhaseChanged { phase } => match phase {
            PollPhase::Aggressive => {
                println!("Estimated time reached, checking for completion...");
            }
            PollPhase::Slow => {
                println!("Still working. Switching to slow polling...");
            }
            PollPhase::Countdown | PollPhase::Idle => {}
        },
        ResearchEvent::AutoMinimize => {}
        ResearchEvent::CompletionDetected => {
            println!("Research complete! Document added to the library.");
        }
        ResearchEvent::Finished => println!("Done."),
        ResearchEvent::Cancelled => println!("Research cancelled."),
        ResearchEvent::Failed { message } => println!("{message}"),
    }
}
