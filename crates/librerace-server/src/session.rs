//! Per-connection session handling
//!
//! Each connection speaks newline-delimited JSON: requests are
//! answered on the same stream, and a `subscribe` request flips the
//! session into streaming mode, forwarding the subscriber's mailbox
//! until the peer goes away. The mailbox is always deregistered on the
//! way out, and a send failing against a dead peer is a debug-level
//! event, never anything louder.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec};
use tracing::debug;

use librerace_core::engine::RaceEngine;
use librerace_core::physics::ControlInput;
use librerace_core::protocol::{
    CheckInReply, ClientRequest, InputAck, ServerMessage, TrackInfo, WireError, MAX_FRAME_BYTES,
};
use librerace_core::race::{CheckInOutcome, InputOutcome};

type Wire = Framed<TcpStream, LinesCodec>;

async fn send(framed: &mut Wire, message: &ServerMessage) -> Result<(), WireError> {
    let json = serde_json::to_string(message)?;
    framed.send(json).await?;
    Ok(())
}

/// Drive one connection until it disconnects or subscribes-and-drains.
pub async fn handle_connection(engine: Arc<RaceEngine>, stream: TcpStream) -> Result<(), WireError> {
    let mut framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_FRAME_BYTES));

    while let Some(line) = framed.next().await {
        let line = line?;
        let request = match serde_json::from_str::<ClientRequest>(&line) {
            Ok(request) => request,
            Err(err) => {
                debug!(%err, "unparseable request");
                send(
                    &mut framed,
                    &ServerMessage::Error {
                        message: format!("bad request: {}", err),
                    },
                )
                .await?;
                continue;
            }
        };

        match request {
            ClientRequest::CheckIn {
                car_id,
                display_name,
                credential: _,
            } => {
                let reply = check_in(&engine, &car_id, &display_name).await;
                send(&mut framed, &ServerMessage::CheckIn(reply)).await?;
            }

            ClientRequest::GetTrack => {
                let track = TrackInfo::from(engine.track().as_ref());
                send(&mut framed, &ServerMessage::Track(track)).await?;
            }

            ClientRequest::SubmitInput {
                car_id,
                auth_token,
                steering,
                throttle,
                brake,
                boost,
                timestamp,
                sequence,
            } => {
                let input = ControlInput {
                    steering,
                    throttle,
                    brake,
                    boost,
                    client_timestamp: timestamp,
                    sequence,
                };
                let ack = match engine.submit_input(&car_id, &auth_token, input).await {
                    InputOutcome::Accepted { tick } => InputAck {
                        accepted: true,
                        reason: None,
                        game_tick: tick,
                    },
                    InputOutcome::Rejected { reason, tick } => InputAck {
                        accepted: false,
                        reason: Some(reason),
                        game_tick: tick,
                    },
                };
                send(&mut framed, &ServerMessage::InputAck(ack)).await?;
            }

            ClientRequest::Subscribe => {
                // Streaming takes over the connection; nothing else is
                // answered once a session subscribes.
                return stream_updates(engine, framed).await;
            }
        }
    }

    Ok(())
}

async fn check_in(engine: &RaceEngine, car_id: &str, display_name: &str) -> CheckInReply {
    match engine.check_in(car_id, display_name).await {
        CheckInOutcome::Accepted {
            auth_token,
            message,
            is_spectator,
            roster,
            track,
        } => CheckInReply {
            accepted: true,
            message,
            auth_token: Some(auth_token),
            is_spectator,
            race: Some(engine.race_metadata().await),
            cars: roster,
            track: Some(TrackInfo::from(&track)),
        },
        CheckInOutcome::Rejected { message } => CheckInReply {
            accepted: false,
            message,
            auth_token: None,
            is_spectator: false,
            race: None,
            cars: Vec::new(),
            track: None,
        },
    }
}

/// Forward the subscriber mailbox to the peer until either side goes
/// away. The mailbox is deregistered before this returns, whatever the
/// outcome, so a dead session never leaks a mailbox.
async fn stream_updates(engine: Arc<RaceEngine>, mut framed: Wire) -> Result<(), WireError> {
    let (id, mut mailbox) = engine.subscribe();
    debug!(subscriber = %id, "session subscribed");

    let result = async {
        if engine.send_roster_on_subscribe() {
            let cars = engine.roster().await;
            send(&mut framed, &ServerMessage::Roster { cars }).await?;
        }

        // Mailbox closing means the broadcaster dropped us; peer
        // hang-ups surface as send errors. Both just end the stream.
        while let Some(snapshot) = mailbox.recv().await {
            send(&mut framed, &ServerMessage::Update((*snapshot).clone())).await?;
        }
        Ok(())
    }
    .await;

    engine.unsubscribe(id);
    debug!(subscriber = %id, "session unsubscribed");
    result
}
