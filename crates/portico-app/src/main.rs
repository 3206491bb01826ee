use std::sync::Arc;

use anyhow::{Context, Result};
use portico_ai::{AnswerService, HttpAnswerClient, MockAnswerClient};
use portico_config::ConfigStore;
use portico_core::render_markup;
use portico_services::{ChatServices, ChatServicesBuilder, SendOutcome};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ConfigStore::from_default_location()?.load_or_init()?;

    let answer: Arc<dyn AnswerService> = if config.answer_service.has_api_key() {
        Arc::new(HttpAnswerClient::new(config.answer_service.clone()))
    } else {
        info!("no answer service api key configured, using the mock client");
        Arc::new(MockAnswerClient::new())
    };

    let mut builder = ChatServicesBuilder::new(config.resolve_database_path()?, answer);
    if let Some(email) = config.user_email.clone() {
        builder = builder.with_user(email);
    }
    let services = builder.build()?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(run(services))
}

async fn run(services: ChatServices) -> Result<()> {
    let conversation_id = services
        .active_conversation_id()
        .context("no active conversation after bootstrap")?;

    let outcome = services
        .send_message(conversation_id, "Summarize the latest uploaded documents")
        .await?;

    if matches!(outcome, SendOutcome::Completed { .. }) {
        let conversation = services
            .active_conversation()
            .context("active conversation disappeared")?;
        println!("# {}", conversation.title);
        for message in &conversation.messages {
            println!("[{:?}]", message.role);
            println!("{}\n", render_markup(&message.content));
        }
    }

    Ok(())
}
