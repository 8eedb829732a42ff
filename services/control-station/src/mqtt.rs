//! MQTT transport: command publishing and device event ingest.
//!
//! Devices publish on `devices/{device_id}/{topic}`; the station
//! publishes command envelopes on `devices/{device_id}/control`.

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use skyfleet_control::{BusError, Command, CommandBus, ControlPlane};
use skyfleet_domain::DeviceTopic;

use crate::config::Config;

/// Connect to the broker and subscribe to every device topic.
pub async fn connect(
    config: &Config,
) -> Result<(MqttCommandBus, EventLoop), Box<dyn std::error::Error>> {
    let mut options = MqttOptions::new("control-station", &config.mqtt_host, config.mqtt_port);
    options.set_keep_alive(Duration::from_secs(30));

    let (client, eventloop) = AsyncClient::new(options, 64);
    for topic in DeviceTopic::ALL {
        client
            .subscribe(format!("devices/+/{}", topic.as_str()), QoS::AtLeastOnce)
            .await?;
    }
    info!(
        "Connected to MQTT broker at {}:{}",
        config.mqtt_host, config.mqtt_port
    );

    Ok((MqttCommandBus { client }, eventloop))
}

/// Command bus backed by the shared MQTT client.
pub struct MqttCommandBus {
    client: AsyncClient,
}

#[async_trait]
impl CommandBus for MqttCommandBus {
    async fn send_command(
        &self,
        device_id: &str,
        channel: &str,
        command: &Command,
    ) -> Result<(), BusError> {
        let payload = command.to_wire()?;
        self.client
            .publish(
                format!("devices/{}/{}", device_id, channel),
                QoS::AtLeastOnce,
                false,
                payload,
            )
            .await
            .map_err(|e| BusError::Publish(e.to_string()))
    }
}

/// Drive the MQTT event loop forever, dispatching device publishes
/// into the control plane.
pub async fn run_ingest(mut eventloop: EventLoop, plane: Arc<ControlPlane>) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let Some((device_id, kind)) = parse_topic(&publish.topic) else {
                    debug!("Ignoring publish on unrecognized topic '{}'", publish.topic);
                    continue;
                };
                let device_id = device_id.to_string();
                let kind = kind.to_string();
                let payload = publish.payload.to_vec();
                let plane = plane.clone();
                tokio::spawn(async move {
                    plane.handle_device_event(&device_id, &kind, &payload).await;
                });
            }
            Ok(_) => {}
            Err(e) => {
                warn!("MQTT connection error: {}, retrying in 1s", e);
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}

/// Split `devices/{device_id}/{kind}` into its parts. Topics with any
/// other shape are ignored.
fn parse_topic(topic: &str) -> Option<(&str, &str)> {
    let mut segments = topic.split('/');
    match (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) {
        (Some("devices"), Some(device_id), Some(kind), None) if !device_id.is_empty() => {
            Some((device_id, kind))
        }
        _ => None,
    }
}
