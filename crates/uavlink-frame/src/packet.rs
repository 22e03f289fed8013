use std::fmt;

use serde::{Deserialize, Serialize};

/// Latitude used when a packet carries none.
pub const DEFAULT_LAT: f64 = 5.02;
/// Longitude used when a packet carries none.
pub const DEFAULT_LNG: f64 = -9.02;
/// Altitude used when a packet carries none.
pub const DEFAULT_HIGH: f64 = 10.3;
/// Payload used when a packet carries none.
pub const DEFAULT_DATA: &str = "0";
/// Role tag used when a packet carries none.
pub const DEFAULT_DEVICE: &str = "uav";

/// Device identifier. The firmware sends either a string or a small integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeviceId {
    Text(String),
    Number(i64),
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceId::Text(s) => f.write_str(s),
            DeviceId::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for DeviceId {
    fn from(value: &str) -> Self {
        DeviceId::Text(value.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(value: String) -> Self {
        DeviceId::Text(value)
    }
}

impl From<i64> for DeviceId {
    fn from(value: i64) -> Self {
        DeviceId::Number(value)
    }
}

/// One command/telemetry unit exchanged over the link.
///
/// Only `id` and `type` are required on the wire; every other field is
/// filled with its default when absent. Inbound packets may spell the
/// longitude `log`; outbound packets always use `lng`.
///
/// `type` and `seq` accept any JSON integer that fits an `i64`. Emitters only
/// ever send `seq` in `0..=254`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    pub id: DeviceId,
    #[serde(rename = "type")]
    pub kind: i64,
    #[serde(default)]
    pub seq: i64,
    #[serde(default = "default_lat")]
    pub lat: f64,
    #[serde(default = "default_lng", alias = "log")]
    pub lng: f64,
    #[serde(default = "default_high")]
    pub high: f64,
    #[serde(default = "default_data")]
    pub data: String,
    #[serde(default = "default_device")]
    pub device: String,
}

impl Packet {
    /// Create a packet with every optional field at its default.
    pub fn new(id: impl Into<DeviceId>, kind: i64) -> Self {
        Self {
            id: id.into(),
            kind,
            seq: 0,
            lat: DEFAULT_LAT,
            lng: DEFAULT_LNG,
            high: DEFAULT_HIGH,
            data: DEFAULT_DATA.to_string(),
            device: DEFAULT_DEVICE.to_string(),
        }
    }

    pub fn with_seq(mut self, seq: i64) -> Self {
        self.seq = seq;
        self
    }

    pub fn with_position(mut self, lat: f64, lng: f64) -> Self {
        self.lat = lat;
        self.lng = lng;
        self
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id={} type={} seq={} lat={} lng={} high={} data={:?} device={}",
            self.id, self.kind, self.seq, self.lat, self.lng, self.high, self.data, self.device
        )
    }
}

fn default_lat() -> f64 {
    DEFAULT_LAT
}

fn default_lng() -> f64 {
    DEFAULT_LNG
}

fn default_high() -> f64 {
    DEFAULT_HIGH
}

fn default_data() -> String {
    DEFAULT_DATA.to_string()
}

fn default_device() -> String {
    DEFAULT_DEVICE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_packet_fills_defaults() {
        let packet: Packet = serde_json::from_str(r#"{"id":"1","type":26}"#).unwrap();
        assert_eq!(packet, Packet::new("1", 26));
    }

    #[test]
    fn accepts_numeric_id_and_log_alias() {
        let packet: Packet =
            serde_json::from_str(r#"{"id":3,"type":28,"lat":1.5,"log":-2.5}"#).unwrap();
        assert_eq!(packet.id, DeviceId::Number(3));
        assert_eq!(packet.lat, 1.5);
        assert_eq!(packet.lng, -2.5);
    }

    #[test]
    fn serializes_all_fields_in_wire_order() {
        let json = serde_json::to_string(&Packet::new("4", 25)).unwrap();
        assert_eq!(
            json,
            r#"{"id":"4","type":25,"seq":0,"lat":5.02,"lng":-9.02,"high":10.3,"data":"0","device":"uav"}"#
        );
    }

    #[test]
    fn numeric_id_serializes_as_number() {
        let json = serde_json::to_string(&Packet::new(7i64, 20).with_seq(9)).unwrap();
        assert!(json.starts_with(r#"{"id":7,"type":20,"seq":9,"#));
    }

    #[test]
    fn wide_and_negative_integers_are_accepted() {
        let packet: Packet =
            serde_json::from_str(r#"{"id":"1","type":70000,"seq":300}"#).unwrap();
        assert_eq!((packet.kind, packet.seq), (70_000, 300));

        let packet: Packet = serde_json::from_str(r#"{"id":"1","type":-1,"seq":-5}"#).unwrap();
        assert_eq!((packet.kind, packet.seq), (-1, -5));
    }

    #[test]
    fn fractional_type_is_rejected() {
        assert!(serde_json::from_str::<Packet>(r#"{"id":"1","type":24.5}"#).is_err());
    }

    #[test]
    fn missing_type_is_rejected() {
        assert!(serde_json::from_str::<Packet>(r#"{"id":"1"}"#).is_err());
    }

    #[test]
    fn missing_id_is_rejected() {
        assert!(serde_json::from_str::<Packet>(r#"{"type":24}"#).is_err());
    }

    #[test]
    fn display_is_single_line() {
        let text = Packet::new("1", 24).to_string();
        assert_eq!(
            text,
            "id=1 type=24 seq=0 lat=5.02 lng=-9.02 high=10.3 data=\"0\" device=uav"
        );
    }
}
