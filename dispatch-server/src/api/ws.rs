//! Notification WebSocket endpoint — 实时通知推送
//!
//! GET /notifications/ws?token=<JWT>
//! Auth: `Authorization: Bearer` header，或 `token` query parameter
//! （浏览器 WebSocket 不支持自定义 headers）。升级前校验，凭证无效直接返回 401。
//!
//! 协议 (JSON `{"event", "data"}` frames):
//! - Client → Server: `join-room`, `leave-room`
//! - Server → Client: `notification`, `error`

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::message::{ClientEvent, ServerEvent};
use tokio::time::Duration;

use crate::auth::bearer_token;
use crate::live::Session;
use crate::state::AppState;

const PING_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    token: Option<String>,
}

/// GET /notifications/ws
///
/// The upgrade extractor runs as a `Result` so the credential is checked
/// first: an unauthenticated client always sees 401, never an upgrade error.
pub async fn handle_notifications_ws(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<WsAuthQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let token = bearer_token(&headers, None)
        .map(String::from)
        .or(query.token.filter(|t| !t.is_empty()));

    let session = match state.hub().connect(token.as_deref()).await {
        Ok(session) => session,
        Err(e) => return AppError::from(e).into_response(),
    };

    match ws {
        Ok(ws) => ws
            .on_upgrade(move |socket| notification_session(socket, session))
            .into_response(),
        // Session drops here and unregisters
        Err(rejection) => rejection.into_response(),
    }
}

async fn notification_session(socket: WebSocket, session: Session) {
    let (sink, stream) = socket.split();
    run_session(sink, stream, session).await;
}

/// Pump hub notifications out and client frames in until either side closes
async fn run_session<Si, St, E>(mut sink: Si, mut stream: St, mut session: Session)
where
    Si: Sink<Message> + Unpin,
    St: Stream<Item = Result<Message, E>> + Unpin,
{
    let connection_id = session.id();
    let principal_id = session.principal().id.clone();

    tracing::info!(connection_id, principal_id = %principal_id, "Notification WS connected");

    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    ping_interval.tick().await; // skip immediate

    loop {
        tokio::select! {
            _ = ping_interval.tick() => {
                if sink.send(Message::Ping(vec![].into())).await.is_err() {
                    break;
                }
            }

            event = session.recv() => {
                match event {
                    Some(event) => {
                        if send_event(&mut sink, &event).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = handle_client_text(&session, &text)
                            && send_event(&mut sink, &reply).await.is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    // Dropping the session unregisters it from the hub
    drop(session);
    tracing::info!(connection_id, principal_id = %principal_id, "Notification WS disconnected");
}

/// Apply one client frame. Returns an error frame to send back, if any.
pub(crate) fn handle_client_text(session: &Session, text: &str) -> Option<ServerEvent> {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(connection_id = session.id(), error = %e, "Unreadable client frame");
            return Some(ServerEvent::Error {
                code: ErrorCode::InvalidFormat,
                message: format!("unreadable frame: {e}"),
            });
        }
    };

    match event {
        ClientEvent::JoinRoom(req) => match session.join(&req.room) {
            Ok(()) => None,
            Err(e) => {
                let err = AppError::from(e);
                Some(ServerEvent::Error {
                    code: err.code,
                    message: err.message,
                })
            }
        },
        ClientEvent::LeaveRoom(req) => {
            session.leave(&req.room);
            None
        }
    }
}

async fn send_event<S>(sink: &mut S, event: &ServerEvent) -> Result<(), ()>
where
    S: Sink<Message> + Unpin,
{
    let json = serde_json::to_string(event).map_err(|_| ())?;
    sink.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::JwtIdentityResolver;
    use crate::live::NotificationHub;
    use futures::channel::mpsc;
    use shared::message::{AlertLevel, Notification};
    use shared::models::Principal;
    use std::sync::Arc;

    fn hub() -> NotificationHub {
        NotificationHub::new(Arc::new(JwtIdentityResolver::new(
            "ws-test-secret-ws-test-secret-ws",
        )))
    }

    #[test]
    fn test_join_and_leave_frames() {
        let hub = hub();
        let session = hub.register(Principal::customer("c-1"));

        let reply = handle_client_text(&session, r#"{"event":"join-room","data":{"room":"promo"}}"#);
        assert!(reply.is_none());
        assert!(session.rooms().contains(&"promo".to_string()));

        let reply =
            handle_client_text(&session, r#"{"event":"leave-room","data":{"room":"promo"}}"#);
        assert!(reply.is_none());
        assert!(!session.rooms().contains(&"promo".to_string()));
    }

    #[test]
    fn test_reserved_join_gets_error_frame() {
        let hub = hub();
        let session = hub.register(Principal::customer("c-1"));
        let reply =
            handle_client_text(&session, r#"{"event":"join-room","data":{"room":"role:kitchen"}}"#);
        assert!(matches!(
            reply,
            Some(ServerEvent::Error {
                code: ErrorCode::PermissionDenied,
                ..
            })
        ));
    }

    #[test]
    fn test_garbage_frame() {
        let hub = hub();
        let session = hub.register(Principal::kitchen("k-1"));
        assert!(matches!(
            handle_client_text(&session, "not json"),
            Some(ServerEvent::Error {
                code: ErrorCode::InvalidFormat,
                ..
            })
        ));
    }

    fn text_frame(json: &str) -> Result<Message, axum::Error> {
        Ok(Message::Text(json.into()))
    }

    async fn next_json(rx: &mut mpsc::UnboundedReceiver<Message>) -> serde_json::Value {
        loop {
            match rx.next().await {
                Some(Message::Text(text)) => return serde_json::from_str(text.as_str()).unwrap(),
                Some(_) => continue,
                None => panic!("session closed"),
            }
        }
    }

    #[tokio::test]
    async fn test_session_forwards_notifications_as_text_frames() {
        let hub = hub();
        let session = hub.register(Principal::customer("c-1"));
        let (out_tx, mut out_rx) = mpsc::unbounded::<Message>();
        let (in_tx, in_rx) = mpsc::unbounded::<Result<Message, axum::Error>>();
        let task = tokio::spawn(run_session(out_tx, in_rx, session));

        assert_eq!(
            hub.publish_to_identity("c-1", &Notification::system_alert("hello", AlertLevel::Info)),
            1
        );
        let frame = next_json(&mut out_rx).await;
        assert_eq!(frame["event"], "notification");
        assert_eq!(frame["data"]["message"], "hello");
        assert!(frame["data"]["type"].is_string());
        assert!(frame["data"]["timestamp"].is_string());

        // Frames are handled in order, so the error reply to the second one
        // means the join has landed
        in_tx
            .unbounded_send(text_frame(r#"{"event":"join-room","data":{"room":"promo"}}"#))
            .unwrap();
        in_tx.unbounded_send(text_frame("not json")).unwrap();
        let frame = next_json(&mut out_rx).await;
        assert_eq!(frame["event"], "error");
        assert_eq!(hub.room_size("promo"), 1);

        hub.publish_to_room("promo", &Notification::system_alert("sale", AlertLevel::Info));
        assert_eq!(next_json(&mut out_rx).await["data"]["message"], "sale");

        // Client going away unregisters the handle
        drop(in_tx);
        task.await.unwrap();
        assert_eq!(hub.connection_count(), 0);
        assert_eq!(hub.room_size("promo"), 0);
    }
}
