//! Request handler for the configuration store

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::config::{CardDocument, ConfigSource, SharedConfig};
use crate::error::EngineError;
use crate::event_handler::ReloadSignal;
use crate::ipc::{ConfigRequest, ConfigResponse, Envelope};

/// Drain the request channel until every client is dropped
pub async fn run_request_loop(
    mut requests: mpsc::Receiver<Envelope>,
    config: SharedConfig,
    signals: broadcast::Sender<ReloadSignal>,
) {
    info!("Configuration handler started");

    while let Some(Envelope { request, reply }) = requests.recv().await {
        let (response, signal) = handle_request(&config, request);

        if let Some(signal) = signal
            && signals.send(signal).is_err()
        {
            debug!(signal = ?signal, "No reload subscribers");
        }

        if reply.send(response).is_err() {
            debug!("Requester went away before the reply");
        }
    }

    info!("Configuration handler stopped");
}

/// Apply one request. A signal is returned only when something was persisted.
pub fn handle_request(config: &SharedConfig, request: ConfigRequest) -> (ConfigResponse, Option<ReloadSignal>) {
    let verb = request.verb();
    let signal = match &request {
        ConfigRequest::InstallBlueprint { .. } | ConfigRequest::DeleteBlueprint { .. } => {
            ReloadSignal::BlueprintsUpdated
        }
        _ => ReloadSignal::ConfigurationUpdated,
    };

    let result = match request {
        ConfigRequest::GetConfiguration => {
            return (ConfigResponse::Configuration(Box::new(config.get_configuration())), None);
        }
        ConfigRequest::AddCard { area_id, card, spans } => config.apply(|doc| {
            doc.add_card(&area_id, card, spans);
            Ok(())
        }),
        ConfigRequest::RemoveCard { area_id, card_id } => config.apply(|doc| doc.remove_card(&area_id, &card_id)),
        ConfigRequest::EditCard { target, card } => {
            config.apply(|doc| doc.set_card(&target, card.map(CardDocument::plain)))
        }
        ConfigRequest::EditEntity { entity_id, flags } => config.apply(|doc| {
            doc.edit_entity(&entity_id, &flags);
            Ok(())
        }),
        ConfigRequest::EditButton { target, settings } => config.apply(|doc| {
            doc.edit_button(&target, &settings);
            Ok(())
        }),
        ConfigRequest::SortButton {
            button,
            field,
            assignments,
        } => config.apply(|doc| doc.sort_buttons(button, field, &assignments)),
        ConfigRequest::SortEntity { field, assignments } => {
            config.apply(|doc| doc.sort_entities(field, &assignments))
        }
        ConfigRequest::InstallBlueprint { document } => {
            config.apply(|doc| doc.install_blueprint(*document).map(|_| ()))
        }
        ConfigRequest::UseBlueprint { name, target, inputs } => {
            config.apply(|doc| doc.use_blueprint(&name, &target, inputs))
        }
        ConfigRequest::DeleteBlueprint { name } => config.apply(|doc| doc.delete_blueprint(&name)),
        ConfigRequest::EditHomepageHeader { header } => config.apply(|doc| {
            doc.set_homepage_header(header);
            Ok(())
        }),
        ConfigRequest::RemoveMorePage { name } => config.apply(|doc| doc.remove_more_page(&name)),
    };

    match result {
        Ok(()) => {
            debug!(verb, "Mutation applied");
            (ConfigResponse::Ok, Some(signal))
        }
        Err(e @ EngineError::Persistence(_)) => {
            error!(verb, error = %e, "Failed to persist configuration");
            (ConfigResponse::Error(e.to_string()), None)
        }
        Err(e) => {
            warn!(verb, error = %e, "Mutation rejected");
            (ConfigResponse::Error(e.to_string()), None)
        }
    }
}
