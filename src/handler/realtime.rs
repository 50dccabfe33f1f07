use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, WebSocketUpgrade,
    },
    response::Response,
    routing::get,
    Extension, Router,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::{
    db::{chatdb::ChatExt, requestdb::RequestExt},
    error::{ErrorMessage, HttpError},
    middleware::JWTAuthMiddeware,
    models::usermodel::User,
    service::realtime::{access_check, AccessCheck, RowChange, RowFilter, Table},
    AppState,
};

pub fn realtime_handler() -> Router {
    Router::new().route("/", get(subscribe))
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionQueryDto {
    pub table: String,
    pub filter: Option<String>,
}

impl SubscriptionQueryDto {
    pub fn parse(&self) -> Result<(Table, Option<RowFilter>), HttpError> {
        let table = self
            .table
            .parse::<Table>()
            .map_err(|e| HttpError::bad_request(e.to_string()))?;

        let filter = self
            .filter
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .map(RowFilter::parse)
            .transpose()
            .map_err(|e| HttpError::bad_request(e.to_string()))?;

        Ok((table, filter))
    }
}

async fn authorize(
    app_state: &AppState,
    user: &User,
    table: Table,
    filter: Option<&RowFilter>,
) -> Result<(), HttpError> {
    match access_check(user, table, filter) {
        AccessCheck::Allowed => Ok(()),
        AccessCheck::ChatMembership(chat_id) => {
            let is_participant = app_state
                .db_client
                .is_chat_participant(chat_id, user.id)
                .await
                .map_err(|e| HttpError::server_error(e.to_string()))?;

            if is_participant {
                Ok(())
            } else {
                Err(HttpError::forbidden(ErrorMessage::PermissionDenied.to_string()))
            }
        }
        AccessCheck::RequestOwnership(request_id) => {
            let request = app_state
                .db_client
                .get_request(request_id)
                .await
                .map_err(|e| HttpError::server_error(e.to_string()))?;

            match request {
                Some(request) if request.shipper_id == user.id => Ok(()),
                _ => Err(HttpError::forbidden(ErrorMessage::PermissionDenied.to_string())),
            }
        }
        AccessCheck::Denied(reason) => Err(HttpError::forbidden(reason)),
    }
}

pub async fn subscribe(
    ws: WebSocketUpgrade,
    Query(query): Query<SubscriptionQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<Response, HttpError> {
    let (table, filter) = query.parse()?;
    authorize(&app_state, &user.user, table, filter.as_ref()).await?;

    tracing::debug!(
        "user {} subscribed to {} {}",
        user.user.id,
        table.as_str(),
        filter.as_ref().map(ToString::to_string).unwrap_or_default()
    );

    Ok(ws.on_upgrade(move |socket| stream_changes(socket, app_state, table, filter)))
}

/// Changes queued per socket before a slow client starts losing them.
const SOCKET_BUFFER: usize = 64;

/// Queues a change for the socket. A full queue drops the change.
fn forward_or_drop(proxy_tx: &mpsc::Sender<Arc<RowChange>>, change: Arc<RowChange>) -> bool {
    match proxy_tx.try_send(change) {
        Ok(()) => true,
        Err(TrySendError::Full(change)) => {
            tracing::warn!(
                "realtime client is not keeping up, {} change dropped",
                change.table.as_str()
            );
            false
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

async fn stream_changes(socket: WebSocket, app_state: Arc<AppState>, table: Table, filter: Option<RowFilter>) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (proxy_tx, mut proxy_rx) = mpsc::channel::<Arc<RowChange>>(SOCKET_BUFFER);

    // unsubscribes when dropped at the end of this function
    let _listener = app_state.realtime.listen(table, filter, move |change| {
        forward_or_drop(&proxy_tx, change);
    });

    tracing::debug!("{} realtime listeners", app_state.realtime.receiver_count());

    let forward = tokio::spawn(async move {
        while let Some(change) = proxy_rx.recv().await {
            match serde_json::to_string(&*change) {
                Ok(text) => {
                    if let Err(err) = ws_tx.send(Message::Text(text)).await {
                        tracing::debug!("realtime socket closed while sending: {err:?}");
                        break;
                    }
                }
                Err(err) => {
                    tracing::error!("Failed to encode {} change: {err:?}", change.table.as_str());
                }
            }
        }
    });

    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(err) => {
                tracing::debug!("realtime socket error: {err:?}");
                break;
            }
        }
    }

    forward.abort();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::realtime::{ChangeKind, RealtimeHub};

    fn query(table: &str, filter: Option<&str>) -> SubscriptionQueryDto {
        SubscriptionQueryDto {
            table: table.to_string(),
            filter: filter.map(str::to_string),
        }
    }

    #[test]
    fn parses_table_and_filter() {
        let (table, filter) = query("messages", Some("chat_id=eq.42")).parse().unwrap();
        assert_eq!(table, Table::Messages);
        assert_eq!(filter, Some(RowFilter::eq("chat_id", "42")));
    }

    #[test]
    fn empty_filter_means_none() {
        let (_, filter) = query("requests", Some("  ")).parse().unwrap();
        assert_eq!(filter, None);
    }

    #[tokio::test]
    async fn slow_socket_drops_changes_instead_of_queueing() {
        let hub = RealtimeHub::new(SOCKET_BUFFER * 4);
        let (proxy_tx, mut proxy_rx) = mpsc::channel(SOCKET_BUFFER);
        let mut sub = hub.subscribe(Table::Requests, None);

        for n in 0..SOCKET_BUFFER + 10 {
            hub.publish(Table::Requests, ChangeKind::Insert, &serde_json::json!({ "n": n }));
        }

        let mut queued = 0;
        for _ in 0..SOCKET_BUFFER + 10 {
            let change = sub.next().await.unwrap();
            if forward_or_drop(&proxy_tx, change) {
                queued += 1;
            }
        }
        assert_eq!(queued, SOCKET_BUFFER);
        assert_eq!(proxy_rx.recv().await.unwrap().record["n"], 0);

        drop(proxy_rx);
        hub.publish(Table::Requests, ChangeKind::Insert, &serde_json::json!({ "n": "late" }));
        let late = sub.next().await.unwrap();
        assert!(!forward_or_drop(&proxy_tx, late));
    }

    #[test]
    fn bad_input_is_a_bad_request() {
        let err = query("wagons", None).parse().unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
        let err = query("bids", Some("amount=lt.5")).parse().unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
    }
}
