//! Test data builders for creating simctl listings

use serde_json::{json, Map, Value};

/// Builder for `simctl list --json` output
#[derive(Default)]
pub struct ListingBuilder {
    devices: Map<String, Value>,
    current: Option<String>,
}

impl ListingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a runtime group; following devices are added to it
    pub fn runtime(mut self, identifier: &str) -> Self {
        self.devices
            .entry(identifier.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        self.current = Some(identifier.to_string());
        self
    }

    pub fn device(mut self, udid: &str, name: &str, state: &str) -> Self {
        let runtime = self
            .current
            .clone()
            .expect("call runtime() before device()");
        if let Some(Value::Array(devices)) = self.devices.get_mut(&runtime) {
            devices.push(json!({
                "udid": udid,
                "name": name,
                "state": state,
                "isAvailable": true,
            }));
        }
        self
    }

    pub fn build(self) -> String {
        json!({ "devices": Value::Object(self.devices) }).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_builder() {
        let listing = ListingBuilder::new()
            .runtime("iOS 14")
            .device("A", "iPhone 12", "Booted")
            .build();

        let value: Value = serde_json::from_str(&listing).unwrap();
        assert_eq!(value["devices"]["iOS 14"][0]["udid"], "A");
    }
}
