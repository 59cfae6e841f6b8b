//! `xdm.device` details.

use crate::providers::SystemInfoProvider;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenOrientation {
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Mobile,
    Tablet,
}

/// Device the host runs on. Unknown facts are left out of the payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_orientation: Option<ScreenOrientation>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub device_type: Option<DeviceType>,
}

impl Device {
    /// Read the current device facts. `None` when the host knows none of them.
    pub fn from_system_info(info: &dyn SystemInfoProvider) -> Option<Self> {
        let (screen_width, screen_height) = match info.display_size() {
            Some((width, height)) => (Some(width), Some(height)),
            None => (None, None),
        };
        let device = Self {
            manufacturer: info.manufacturer(),
            model: info.device_name(),
            screen_width,
            screen_height,
            screen_orientation: info.orientation(),
            device_type: info.device_type(),
        };
        (device != Self::default()).then_some(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Phone;

    impl SystemInfoProvider for Phone {
        fn manufacturer(&self) -> Option<String> {
            Some("apple".to_string())
        }

        fn device_name(&self) -> Option<String> {
            Some("test-device-name".to_string())
        }

        fn display_size(&self) -> Option<(u32, u32)> {
            Some((100, 200))
        }

        fn orientation(&self) -> Option<ScreenOrientation> {
            Some(ScreenOrientation::Portrait)
        }

        fn device_type(&self) -> Option<DeviceType> {
            Some(DeviceType::Mobile)
        }
    }

    struct Unknown;

    impl SystemInfoProvider for Unknown {}

    #[test]
    fn reads_every_fact() {
        let device = Device::from_system_info(&Phone).unwrap();
        assert_eq!(device.manufacturer.as_deref(), Some("apple"));
        assert_eq!(device.model.as_deref(), Some("test-device-name"));
        assert_eq!(device.screen_width, Some(100));
        assert_eq!(device.screen_height, Some(200));
        assert_eq!(device.screen_orientation, Some(ScreenOrientation::Portrait));
        assert_eq!(device.device_type, Some(DeviceType::Mobile));
    }

    #[test]
    fn encodes_xdm_field_names() {
        let device = Device::from_system_info(&Phone).unwrap();
        assert_eq!(
            serde_json::to_value(&device).unwrap(),
            json!({
                "manufacturer": "apple",
                "model": "test-device-name",
                "screenHeight": 200,
                "screenWidth": 100,
                "screenOrientation": "portrait",
                "type": "mobile"
            })
        );
    }

    #[test]
    fn unknown_facts_are_omitted() {
        assert_eq!(Device::from_system_info(&Unknown), None);

        let partial = Device {
            device_type: Some(DeviceType::Tablet),
            screen_orientation: Some(ScreenOrientation::Landscape),
            ..Device::default()
        };
        assert_eq!(
            serde_json::to_value(&partial).unwrap(),
            json!({"screenOrientation": "landscape", "type": "tablet"})
        );
    }
}
