/// Capture configuration handed to the engine at start.
///
/// The embedding layer (CLI or UI) owns collection and presentation of these
/// values; the engine validates the subnet strings itself.
#[derive(Debug, Clone, Default)]
pub struct CaptureConfig {
    /// Name of the interface the capture collaborator sniffs on.
    pub interface: String,
    /// Forwarded to the capture collaborator; the engine only carries it.
    pub promiscuous: bool,
    /// Local IPv4 subnet as `address/prefix`, e.g. `192.168.1.0/24`.
    /// Empty means "not configured" and selects the restrictive default.
    pub subnet_v4: String,
    /// User-editable IPv6 unique-local range as `address/prefix`.
    /// The link-local range is fixed and not part of the configuration.
    pub subnet_v6: String,
}
