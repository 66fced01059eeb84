use std::io::Error;
use std::net::SocketAddr;

use futures::StreamExt;
use log::info;
use tokio::net::TcpSocket;
use tokio::sync::mpsc;
use tokio::sync::mpsc::Receiver;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::event::{ClientId, Event};
use crate::handshake::accept_async_with_config;

const LISTEN_BACKLOG: u32 = 50;

// v8 keeps the id opaque while staying cheap to mint per connection
fn next_client_id() -> ClientId {
    Uuid::new_v8(rand::random())
}

/// A ready to use websockets chat listener.
///
/// Binds the TCP endpoint, spawns the accept task and returns the receive
/// side of the event channel: new client connections, their decoded
/// messages, disconnections and errors arrive on it sequentially, ready to
/// be consumed by the hub. Handshakes run inline in the accept task, so at
/// most one new socket is admitted at a time.
pub async fn start_server_with_config(config: ServerConfig) -> Result<Receiver<Event>, Error> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let socket = TcpSocket::new_v4()?;
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    let listener = socket.listen(LISTEN_BACKLOG)?;
    info!("listening on {}", addr);

    let (tx, rx) = mpsc::channel(1000);
    let web_socket_config = config.web_socket_config;

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    let id = next_client_id();
                    info!("accepting client from {}", peer_addr);
                    let ws_connection =
                        match accept_async_with_config(stream, web_socket_config.clone()).await {
                            Ok(connection) => connection,
                            Err(error) => {
                                if tx.send(Event::Failed { id, error }).await.is_err() {
                                    break;
                                }
                                continue;
                            }
                        };
                    // the reader half gets its own task; the write half
                    // travels to the hub with the connected event
                    let (mut ws_reader, ws_writer) = ws_connection.split();

                    if tx
                        .send(Event::Connected {
                            id,
                            writer: ws_writer,
                        })
                        .await
                        .is_err()
                    {
                        break;
                    }

                    let tx_task = tx.clone();
                    tokio::spawn(async move {
                        while let Some(result) = ws_reader.next().await {
                            match result {
                                Ok(payload) => {
                                    if tx_task
                                        .send(Event::Message { id, payload })
                                        .await
                                        .is_err()
                                    {
                                        break;
                                    }
                                }
                                Err(error) => {
                                    let _ = tx_task.send(Event::Failed { id, error }).await;
                                    break;
                                }
                            }
                        }

                        // whatever ended the read side, the hub forgets the
                        // peer on this event
                        let _ = tx_task.send(Event::Disconnected { id }).await;
                    });
                }
                Err(error) => {
                    let failed = Event::Failed {
                        id: next_client_id(),
                        error: error.into(),
                    };
                    if tx.send(failed).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    Ok(rx)
}

pub async fn start_server(port: u16) -> Result<Receiver<Event>, Error> {
    start_server_with_config(ServerConfig {
        port,
        ..ServerConfig::default()
    })
    .await
}
