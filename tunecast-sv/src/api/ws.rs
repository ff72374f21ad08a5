//! WebSocket stream endpoint
//!
//! Each listener gets a bounded frame queue registered with the client
//! registry and a writer task draining it into the socket. Inbound messages
//! are not part of the protocol; they only show the peer is alive. The
//! listener is unregistered on the first read failure, on close, or when the
//! writer stops.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::AppContext;
use crate::registry::Frame;

/// GET /ws - Upgrade and subscribe to the shared stream
pub async fn stream_socket(ws: WebSocketUpgrade, State(ctx): State<AppContext>) -> Response {
    ws.on_upgrade(move |socket| handle_listener(socket, ctx))
}

async fn handle_listener(socket: WebSocket, ctx: AppContext) {
    let (mut sender, mut receiver) = socket.split();
    let (frame_tx, mut frame_rx) = mpsc::channel::<Frame>(ctx.client_queue_frames.max(1));

    let id = match ctx.controller.subscribe(frame_tx).await {
        Ok(id) => id,
        Err(e) => {
            warn!("Upgrade error: {}", e);
            let _ = sender.close().await;
            return;
        }
    };

    // Ends when the registry drops this listener or a send fails
    let mut writer = tokio::spawn(async move {
        while let Some(frame) = frame_rx.recv().await {
            // axum 0.7 binary messages own a Vec, so this is the one copy per listener
            if let Err(e) = sender.send(Message::Binary(frame.to_vec())).await {
                debug!("Write error to client: {}", e);
                break;
            }
        }
        let _ = sender.close().await;
    });

    loop {
        tokio::select! {
            message = receiver.next() => match message {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            _ = &mut writer => break,
        }
    }

    if let Err(e) = ctx.controller.unsubscribe(id).await {
        debug!("Unsubscribe after disconnect failed: {}", e);
    }
    writer.abort();
}
