/**
 * WS - Transport WebSocket des canaux live
 *
 * RÔLE :
 * Traduit une connexion WebSocket en Connection du hub : une tâche d'écriture
 * vide la file de frames du canal, la boucle de lecture traite les événements
 * un par un dans leur ordre d'arrivée.
 */

use crate::channels::Frame;
use crate::hub::Hub;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

pub async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<Hub>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(hub, socket))
}

async fn handle_socket(hub: Hub, socket: WebSocket) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Frame>(hub.channel_buffer());

    let write_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let text = match serde_json::to_string(&frame) {
                Ok(text) => text,
                Err(e) => {
                    log::error!("[ws] cannot encode {}: {}", frame.event, e);
                    continue;
                }
            };
            if ws_sender.send(Message::Text(text.into())).await.is_err() {
                return;
            }
        }
        let _ = ws_sender.close().await;
    });

    let conn = hub.connect(tx);

    while let Some(result) = ws_receiver.next().await {
        let msg = match result {
            Ok(msg) => msg,
            Err(e) => {
                log::warn!("[ws] read error on {}: {}", conn.id(), e);
                break;
            }
        };
        match msg {
            Message::Text(text) => conn.handle_text(text.as_str()).await,
            Message::Binary(bytes) => match std::str::from_utf8(&bytes) {
                Ok(text) => conn.handle_text(text).await,
                Err(_) => log::debug!("[ws] non utf-8 binary frame from {}", conn.id()),
            },
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    // Le détachement du canal libère le dernier émetteur : la tâche d'écriture se termine
    conn.close().await;
    let _ = write_task.await;
}
