use super::config::AntennaId;
use std::fmt;

/// Tags read on one antenna during one tick
///
/// Transient: built after a successful read and consumed immediately by the
/// publish step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult<'a> {
    pub antenna_id: AntennaId,
    pub epcs: &'a [String],
}

impl<'a> ScanResult<'a> {
    pub fn new(antenna_id: AntennaId, epcs: &'a [String]) -> Self {
        Self { antenna_id, epcs }
    }

    pub fn tag_count(&self) -> usize {
        self.epcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epcs.is_empty()
    }

    /// The read filled every slot; more tags may have been in the field.
    pub fn is_saturated(&self, max_tags: usize) -> bool {
        self.tag_count() >= max_tags
    }

    /// Format as `ant=<id> count=<n> <epc_1> ... <epc_n>`.
    ///
    /// Returns `None` for an empty scan, which is never published.
    pub fn to_message(&self) -> Option<OutboundMessage> {
        if self.is_empty() {
            return None;
        }

        let mut text = format!("ant={} count={}", self.antenna_id, self.tag_count());
        for epc in self.epcs {
            text.push(' ');
            text.push_str(epc);
        }

        Some(OutboundMessage { text })
    }
}

/// One published line summarizing a non-empty scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub text: String,
}

impl OutboundMessage {
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for OutboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
