use std::time::Duration;

use rumqttc::v5::MqttOptions;
use tokio_util::sync::CancellationToken;

use crate::control::ControlMessage;
use crate::control::ValidationError;
use crate::error::MqttError;

const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

/// Turns a publish below `topic_prefix` into a control message.
fn to_control_message(
    topic_prefix: &str,
    topic: &[u8],
    payload: &[u8],
) -> Result<ControlMessage, ValidationError> {
    let topic = std::str::from_utf8(topic).map_err(ValidationError::NotUtf8)?;
    let relative = topic
        .strip_prefix(topic_prefix)
        .and_then(|rest| rest.strip_prefix('/'))
        .ok_or_else(|| ValidationError::UnknownTopic(topic.to_string()))?;
    let payload = std::str::from_utf8(payload).map_err(ValidationError::NotUtf8)?;

    Ok(ControlMessage {
        topic: relative.to_string(),
        payload: payload.to_string(),
    })
}

/// Forwards control messages until cancelled.
///
/// `subscriptions` are relative to the configured topic prefix and are
/// subscribed again on every (re)connect.
pub async fn run(
    config: crate::config::MqttConfig,
    subscriptions: Vec<String>,
    cancellation_token: CancellationToken,
    sender: tokio::sync::mpsc::Sender<ControlMessage>,
) -> Result<(), MqttError> {
    let mut mqttoptions =
        MqttOptions::new(&config.client_name, config.host.clone(), config.port);
    mqttoptions.set_keep_alive(config.keep_alive);

    let (client, mut eventloop) = rumqttc::v5::AsyncClient::new(mqttoptions, 100);
    let qos = rumqttc::v5::mqttbytes::QoS::from(config.qos);

    loop {
        let event = cancellation_token
            .run_until_cancelled(eventloop.poll())
            .await;

        let Some(event) = event else {
            tracing::info!("Cancelled, shutting down MQTT processing");
            break;
        };

        let event = match event {
            Ok(event) => event,
            Err(error) => {
                tracing::warn!(?error, backoff = ?RECONNECT_BACKOFF, "MQTT connection failed");
                if cancellation_token
                    .run_until_cancelled(tokio::time::sleep(RECONNECT_BACKOFF))
                    .await
                    .is_none()
                {
                    break;
                }
                continue;
            }
        };

        match event {
            rumqttc::v5::Event::Incoming(rumqttc::v5::Incoming::ConnAck(_)) => {
                for subscription in &subscriptions {
                    let topic = format!("{prefix}/{subscription}", prefix = config.topic_prefix);
                    client
                        .subscribe(&topic, qos)
                        .await
                        .map_err(MqttError::Subscribing)?;
                }
                tracing::info!(count = subscriptions.len(), prefix = ?config.topic_prefix, "Subscribed");
            }

            rumqttc::v5::Event::Incoming(rumqttc::v5::Incoming::Publish(publish)) => {
                tracing::debug!(topic = ?publish.topic, payload = ?publish.payload, "Received payload");

                let message = match to_control_message(&config.topic_prefix, &publish.topic, &publish.payload) {
                    Ok(message) => message,
                    Err(error) => {
                        tracing::warn!(?error, "Dropping control message");
                        continue;
                    }
                };

                if let Err(error) = sender.send(message).await {
                    tracing::error!(?error, "Failed to send control message to internal channel");
                    break;
                }
            }

            rumqttc::v5::Event::Incoming(_) => {
                // nothing
            }

            rumqttc::v5::Event::Outgoing(_outgoing) => {
                // nothing
            }
        }
    }

    Ok(())
}
