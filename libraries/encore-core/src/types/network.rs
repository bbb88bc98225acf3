/// Network condition types
use serde::{Deserialize, Serialize};

/// Interface carrying the current network path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceClass {
    Wifi,
    Cellular,
    /// Wired, loopback, unknown, or no interface at all
    #[default]
    Other,
}

/// Snapshot of connectivity
///
/// `available == false` is a stronger signal than `interface == Other`:
/// a path may be up over an unclassified interface, and an unavailable
/// path may still report whichever interface it last tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkState {
    pub available: bool,
    pub interface: InterfaceClass,
}

impl NetworkState {
    pub const fn new(available: bool, interface: InterfaceClass) -> Self {
        Self {
            available,
            interface,
        }
    }

    /// Connected over Wi-Fi
    pub const fn wifi() -> Self {
        Self::new(true, InterfaceClass::Wifi)
    }

    /// Connected over cellular
    pub const fn cellular() -> Self {
        Self::new(true, InterfaceClass::Cellular)
    }

    /// No usable path
    pub const fn offline() -> Self {
        Self::new(false, InterfaceClass::Other)
    }

    pub fn is_wifi(&self) -> bool {
        self.available && self.interface == InterfaceClass::Wifi
    }

    pub fn is_cellular(&self) -> bool {
        self.available && self.interface == InterfaceClass::Cellular
    }
}

impl Default for NetworkState {
    /// Assume a usable but unclassified path until the first report arrives
    fn default() -> Self {
        Self::new(true, InterfaceClass::Other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_interface_is_not_offline() {
        let state = NetworkState::new(true, InterfaceClass::Other);
        assert!(state.available);
        assert!(!state.is_wifi());
        assert_ne!(state, NetworkState::offline());
    }

    #[test]
    fn unavailable_wifi_is_not_wifi() {
        let state = NetworkState::new(false, InterfaceClass::Wifi);
        assert!(!state.is_wifi());
    }
}
