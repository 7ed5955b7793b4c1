//! Beacon information elements
//!
//! The variable-length tail of a beacon body is a run of tagged
//! variable-length fields (SSID, supported rates, ...). This module holds the
//! decoded `(tag, value)` pairs in wire order and resolves script lookups by
//! hex-encoded tag.

use std::fmt;

use crate::number::BigNumber;
use crate::IE_TAG_SSID;

/// A single decoded information element.
#[derive(Debug, Clone, PartialEq)]
pub struct InformationElement {
    /// Element tag as it appears on the wire.
    pub tag: u8,
    /// Element value in wire byte order.
    pub value: BigNumber,
}

/// Information elements of one beacon body, wire order preserved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InformationElementList {
    elements: Vec<InformationElement>,
}

impl InformationElementList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an element, keeping insertion (wire) order.
    pub fn push(&mut self, tag: u8, value: BigNumber) {
        self.elements.push(InformationElement { tag, value });
    }

    /// Number of decoded elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether no element was decoded.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Look up the first element with the given tag.
    pub fn get(&self, tag: u8) -> Option<&InformationElement> {
        self.elements.iter().find(|element| element.tag == tag)
    }

    /// Resolve a script field name as a hex-encoded tag, first match wins.
    ///
    /// A name that is not valid hex, or wider than one byte, is a normal
    /// miss and yields the null value.
    pub fn get_value(&self, field: &str) -> BigNumber {
        match u8::from_str_radix(field, 16) {
            Ok(tag) => self
                .get(tag)
                .map(|element| element.value.clone())
                .unwrap_or_else(BigNumber::null),
            Err(_) => BigNumber::null(),
        }
    }

    /// Iterate over the elements in wire order.
    pub fn iter(&self) -> impl Iterator<Item = &InformationElement> {
        self.elements.iter()
    }
}

/// Human-readable label for well-known element tags.
fn tag_label(tag: u8) -> Option<&'static str> {
    match tag {
        0 => Some("SSID"),
        1 => Some("Supported rates"),
        2 => Some("FH parameter set"),
        3 => Some("DS parameter set"),
        4 => Some("CF parameter set"),
        5 => Some("Traffic Indication Map (TIM)"),
        6 => Some("IBSS parameter set"),
        16 => Some("Challenge text"),
        _ => None,
    }
}

impl fmt::Display for InformationElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match tag_label(self.tag) {
            Some(label) => label.to_string(),
            None => format!("0x{:02X}", self.tag),
        };

        // The SSID is text by convention; everything else renders as hex.
        let value = if self.tag == IE_TAG_SSID {
            self.value.to_text_string()
        } else {
            self.value.to_hex_string()
        }
        .unwrap_or_default();

        write!(f, "{:-<30}: {}", label, value)
    }
}

impl fmt::Display for InformationElementList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.elements.iter().enumerate() {
            let branch = if i + 1 == self.elements.len() {
                "└─"
            } else {
                "├─"
            };
            writeln!(f, "{}{}", branch, element)?;
        }
        Ok(())
    }
}
