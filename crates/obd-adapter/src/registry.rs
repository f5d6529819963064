//! Known adapter families

use crate::adapter::AdapterProtocol;
use crate::drivedeck::DriveDeckAdapter;
use tracing::debug;

/// Fresh instances of every supported adapter family
pub fn known_adapters() -> Vec<Box<dyn AdapterProtocol>> {
    vec![Box::new(DriveDeckAdapter::new())]
}

/// First adapter family whose fingerprint matches the device name
pub fn select_adapter(device_name: &str) -> Option<Box<dyn AdapterProtocol>> {
    let selected = known_adapters()
        .into_iter()
        .find(|adapter| adapter.supports_device(device_name));
    if selected.is_none() {
        debug!("No adapter family matches device {:?}", device_name);
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_drivedeck() {
        let adapter = select_adapter("DriveDeck W4 OBD").expect("match");
        assert_eq!(adapter.name(), "DriveDeck Sport");
        assert!(select_adapter("OBDLink MX").is_none());
    }
}
