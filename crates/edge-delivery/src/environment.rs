//! `xdm.environment.type` values.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentType {
    Browser,
    Application,
    Iot,
    External,
    Widget,
}

impl EnvironmentType {
    /// Map a host run mode. `Application` is an app, `Extension` a widget.
    pub fn from_run_mode(run_mode: &str) -> Option<Self> {
        match run_mode {
            "Application" => Some(EnvironmentType::Application),
            "Extension" => Some(EnvironmentType::Widget),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EnvironmentType::Browser => "browser",
            EnvironmentType::Application => "application",
            EnvironmentType::Iot => "iot",
            EnvironmentType::External => "external",
            EnvironmentType::Widget => "widget",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_mode_mapping() {
        assert_eq!(EnvironmentType::from_run_mode("Application"), Some(EnvironmentType::Application));
        assert_eq!(EnvironmentType::from_run_mode("Extension"), Some(EnvironmentType::Widget));
        assert_eq!(EnvironmentType::from_run_mode("application"), None);
        assert_eq!(EnvironmentType::from_run_mode(""), None);
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&EnvironmentType::Iot).unwrap(), "\"iot\"");
        assert_eq!(EnvironmentType::Widget.as_str(), "widget");
    }
}
