//! MQTT implementation of the scan channel.
//!
//! One MQTT connection per job. A spawned reader thread drives the rumqttc
//! event loop and feeds parsed [`ChannelEvent`]s into an in-process queue;
//! transport failures are surfaced as [`ChannelEvent::ConnectError`] so the
//! controller sees a single closed event taxonomy.

use anyhow::{anyhow, Result};
use rumqttc::v5::{mqttbytes::QoS, Client, Connection, Event, Incoming, MqttOptions};
use std::sync::mpsc;
use std::time::Duration;

use crate::scan_job::channel::{ChannelConnector, ScanChannel};
use crate::scan_job::event::{parse_channel_event, ChannelEvent, SubscribeScan};

/// MQTT channel settings.
#[derive(Clone, Debug)]
pub struct MqttChannelConfig {
    /// Broker address as `host:port`.
    pub broker_addr: String,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Topic prefix; job events arrive on `{prefix}/jobs/{scan_id}/events`.
    pub topic_prefix: String,
}

impl Default for MqttChannelConfig {
    fn default() -> Self {
        Self {
            broker_addr: "127.0.0.1:1883".to_string(),
            client_id: "mealscan".to_string(),
            username: None,
            password: None,
            topic_prefix: "mealscan".to_string(),
        }
    }
}

impl MqttChannelConfig {
    fn endpoint(&self) -> Result<(String, u16)> {
        let (host, port) = self
            .broker_addr
            .rsplit_once(':')
            .ok_or_else(|| anyhow!("broker address must be host:port: {}", self.broker_addr))?;
        let port: u16 = port
            .parse()
            .map_err(|_| anyhow!("invalid broker port in {}", self.broker_addr))?;
        Ok((host.to_string(), port))
    }
}

/// Connector opening one MQTT channel per call.
pub struct MqttConnector {
    config: MqttChannelConfig,
}

impl MqttConnector {
    pub fn new(config: MqttChannelConfig) -> Self {
        Self { config }
    }
}

impl ChannelConnector for MqttConnector {
    fn connect(&self) -> Result<Box<dyn ScanChannel>> {
        let (host, port) = self.config.endpoint()?;
        let mut options = MqttOptions::new(&self.config.client_id, host, port);
        options.set_keep_alive(Duration::from_secs(60));
        options.set_clean_start(true);
        if let Some(user) = &self.config.username {
            options.set_credentials(user, self.config.password.as_deref().unwrap_or_default());
        }

        let (client, connection) = Client::new(options, 10);
        log::info!(
            "scan channel connecting to mqtt broker {}",
            self.config.broker_addr
        );
        Ok(Box::new(MqttScanChannel::spawn(
            client,
            connection,
            self.config.topic_prefix.clone(),
        )))
    }
}

/// Live MQTT channel: client handle plus the reader thread over the
/// connection event loop.
pub struct MqttScanChannel {
    client: Client,
    topic_prefix: String,
    events: mpsc::Receiver<ChannelEvent>,
    reader: Option<std::thread::JoinHandle<()>>,
    closed: bool,
}

impl MqttScanChannel {
    fn spawn(client: Client, mut connection: Connection, topic_prefix: String) -> Self {
        let (tx, rx) = mpsc::channel();
        let reader = std::thread::spawn(move || {
            for event in connection.iter() {
                match event {
                    Ok(Event::Incoming(Incoming::Publish(publish))) => {
                        match parse_channel_event(&publish.payload) {
                            Ok(event) => {
                                if tx.send(event).is_err() {
                                    break;
                                }
                            }
                            Err(e) => log::warn!("dropping malformed channel payload: {}", e),
                        }
                    }
                    Ok(Event::Incoming(_)) | Ok(Event::Outgoing(_)) => {}
                    Err(e) => {
                        log::warn!("mqtt connection error: {}", e);
                        let _ = tx.send(ChannelEvent::ConnectError {
                            message: format!("channel connection failed: {}", e),
                        });
                        break;
                    }
                }
            }
            log::debug!("mqtt reader stopped");
        });

        Self {
            client,
            topic_prefix,
            events: rx,
            reader: Some(reader),
            closed: false,
        }
    }

    fn events_topic(&self, scan_id: &str) -> String {
        format!("{}/jobs/{}/events", self.topic_prefix, scan_id)
    }

    fn subscribe_topic(&self) -> String {
        format!("{}/jobs/subscribe", self.topic_prefix)
    }
}

impl ScanChannel for MqttScanChannel {
    fn subscribe(&mut self, scan_id: &str) -> Result<()> {
        if self.closed {
            return Err(anyhow!("subscribe on closed channel"));
        }
        self.client
            .subscribe(self.events_topic(scan_id), QoS::AtLeastOnce)?;
        let message = SubscribeScan {
            scan_id: scan_id.to_string(),
        };
        let payload = serde_json::to_vec(&message)?;
        self.client
            .publish(self.subscribe_topic(), QoS::AtLeastOnce, false, payload)?;
        log::debug!("subscribed to scan {}", scan_id);
        Ok(())
    }

    fn next_event(&mut self, timeout: Duration) -> Result<Option<ChannelEvent>> {
        if self.closed {
            return Ok(None);
        }
        match self.events.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => Ok(None),
        }
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if let Err(e) = self.client.disconnect() {
            // The reader may already have torn the connection down.
            log::debug!("mqtt disconnect: {}", e);
        }
        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }
        log::debug!("scan channel closed");
        Ok(())
    }
}

impl Drop for MqttScanChannel {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
