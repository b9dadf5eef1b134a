//! Remote scan job: photo upload plus a persistent event channel driving a
//! forward-only status machine.

mod channel;
mod controller;
mod event;
mod mqtt;
mod state;
mod upload;

pub use channel::{ChannelConnector, ChannelProbe, ScanChannel, ScriptedChannel, ScriptedConnector};
pub use controller::ScanJobController;
pub use event::{parse_channel_event, ChannelEvent, SubscribeScan};
pub use mqtt::{MqttChannelConfig, MqttConnector, MqttScanChannel};
pub use state::{ScanJob, ScanResult, ScanStatus};
pub use upload::{HttpUploadClient, StubUploader, UploadClient};
