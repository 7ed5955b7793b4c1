//! IEEE 802.11 frame decoding
//!
//! A [`Frame`] owns one captured raw buffer and decodes it into the fixed MAC
//! header fields plus a frame body selected by (type, subtype). Beacon
//! management frames are the one supported body; the dispatch is an enum so
//! further bodies slot in as new variants.

use std::fmt;

use bytes::Bytes;

use crate::element::InformationElementList;
use crate::number::BigNumber;
use crate::{
    ApWatchError, Result, BEACON_BODY_FIXED_LENGTH, FRAME_CHECK_SUM_LENGTH,
    FRAME_HEADER_LENGTH, IE_TAG_SSID,
};

/// Frame type bits marking a management frame.
const TYPE_MANAGEMENT: u64 = 0;
/// Management subtype bits marking a beacon.
const SUBTYPE_BEACON: u64 = 8;

/// A captured 802.11 frame, raw until decoded.
///
/// The frame transitions raw -> decoded once per capture: [`Frame::decode`]
/// is a no-op while the current raw data is already decoded, and feeding new
/// raw data resets the decoded state.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    raw: Option<Bytes>,
    decoded: bool,

    frame_control: BigNumber,
    duration: BigNumber,
    destination_address: BigNumber,
    source_address: BigNumber,
    bssid: BigNumber,
    sequence_control: BigNumber,
    frame_check_sum: BigNumber,

    body: Option<FrameBody>,
}

impl Frame {
    /// Create a frame with no raw data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the raw capture, invalidating any previous decode.
    pub fn set_raw_data(&mut self, data: Bytes) {
        self.raw = Some(data);
        self.decoded = false;
    }

    /// Whether the current raw data has been decoded.
    pub fn is_decoded(&self) -> bool {
        self.decoded
    }

    /// Decode the raw buffer into header fields and a body.
    ///
    /// Header fields are little-endian on the wire and stored byte-reversed;
    /// the frame check sum is always the last four bytes of the buffer, and
    /// the body is everything in between. Re-decoding already-decoded data is
    /// a no-op.
    pub fn decode(&mut self) -> Result<()> {
        // Bytes clone is a refcount bump.
        let raw = self.raw.clone().ok_or(ApWatchError::NoRawData)?;

        if self.decoded {
            return Ok(());
        }

        let min_length = FRAME_HEADER_LENGTH + FRAME_CHECK_SUM_LENGTH;
        if raw.len() < min_length {
            return Err(ApWatchError::BufferTooShort(format!(
                "{} bytes captured, {} needed for header and FCS",
                raw.len(),
                min_length
            )));
        }

        let mut cursor = 0usize;
        let mut field = |width: usize| -> Result<BigNumber> {
            let value = BigNumber::from_buffer_reversed(&raw[cursor..], width)?;
            cursor += width;
            Ok(value)
        };

        let frame_control = field(2)?;
        let duration = field(2)?;
        let destination_address = field(6)?;
        let source_address = field(6)?;
        let bssid = field(6)?;
        let sequence_control = field(2)?;
        let frame_check_sum =
            BigNumber::from_buffer_reversed(&raw[raw.len() - FRAME_CHECK_SUM_LENGTH..], 4)?;

        // With frame control stored byte-reversed, the subtype sits at bits
        // [8, 12) and the type at bits [12, 14) of the 16-bit value.
        let frame_type = frame_control.cut_bit(12, 2)?.to_unsigned_integer()?;
        let subtype = frame_control.cut_bit(8, 4)?.to_unsigned_integer()?;

        let body_bytes = &raw[FRAME_HEADER_LENGTH..raw.len() - FRAME_CHECK_SUM_LENGTH];
        let body = FrameBody::decode(body_bytes, frame_type, subtype)?;

        self.frame_control = frame_control;
        self.duration = duration;
        self.destination_address = destination_address;
        self.source_address = source_address;
        self.bssid = bssid;
        self.sequence_control = sequence_control;
        self.frame_check_sum = frame_check_sum;
        self.body = Some(body);
        self.decoded = true;

        Ok(())
    }

    /// Resolve a field name to its decoded value.
    ///
    /// The seven header field names resolve here; anything else is delegated
    /// to the body. A miss at every level is the null value, never an error.
    /// Fails with `FrameNotDecoded` when called before [`Frame::decode`].
    pub fn get_value(&self, field: &str) -> Result<BigNumber> {
        if !self.decoded {
            return Err(ApWatchError::FrameNotDecoded);
        }

        let value = match field {
            "frame_control" => self.frame_control.clone(),
            "duration" => self.duration.clone(),
            "destination_address" => self.destination_address.clone(),
            "source_address" => self.source_address.clone(),
            "bssid" => self.bssid.clone(),
            "sequence_control" => self.sequence_control.clone(),
            "frame_check_sum" => self.frame_check_sum.clone(),
            other => match &self.body {
                Some(body) => body.get_value(other),
                None => BigNumber::null(),
            },
        };

        Ok(value)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.decoded {
            return writeln!(f, "Frame not decoded");
        }

        let hex = |n: &BigNumber| n.to_hex_string().unwrap_or_default();

        writeln!(f, "Frame Header :")?;
        writeln!(f, "├─{:-<30}: {}", "Frame control", hex(&self.frame_control))?;
        writeln!(f, "├─{:-<30}: {}", "Duration", hex(&self.duration))?;
        writeln!(
            f,
            "├─{:-<30}: {}",
            "Destination address",
            hex(&self.destination_address)
        )?;
        writeln!(f, "├─{:-<30}: {}", "Source address", hex(&self.source_address))?;
        writeln!(f, "├─{:-<30}: {}", "BSSID", hex(&self.bssid))?;
        writeln!(
            f,
            "├─{:-<30}: {}",
            "Sequence control",
            hex(&self.sequence_control)
        )?;
        writeln!(
            f,
            "└─{:-<30}: {}",
            "Frame check sum (FCS)",
            hex(&self.frame_check_sum)
        )?;
        writeln!(f)?;

        match &self.body {
            Some(body) => write!(f, "{}", body),
            None => writeln!(f, "No body"),
        }
    }
}

/// Decoded frame body, keyed by (type, subtype) at decode time.
#[derive(Debug, Clone)]
pub enum FrameBody {
    /// Management / beacon.
    Beacon(BeaconBody),
}

impl FrameBody {
    /// Decode the body payload for the given frame type and subtype.
    pub fn decode(body: &[u8], frame_type: u64, subtype: u64) -> Result<Self> {
        match (frame_type, subtype) {
            (TYPE_MANAGEMENT, SUBTYPE_BEACON) => Ok(Self::Beacon(BeaconBody::decode(body)?)),
            (frame_type, subtype) => {
                Err(ApWatchError::UnsupportedFrameType { frame_type, subtype })
            }
        }
    }

    /// Resolve a body-level field name.
    pub fn get_value(&self, field: &str) -> BigNumber {
        match self {
            Self::Beacon(beacon) => beacon.get_value(field),
        }
    }
}

impl fmt::Display for FrameBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Beacon(beacon) => write!(f, "{}", beacon),
        }
    }
}

/// Decoded beacon body: three fixed fields plus the information elements.
#[derive(Debug, Clone)]
pub struct BeaconBody {
    timestamp: BigNumber,
    beacon_interval: BigNumber,
    capabilities_information: BigNumber,
    elements: InformationElementList,
}

impl BeaconBody {
    /// Decode a beacon body payload.
    ///
    /// The fixed fields are little-endian and stored byte-reversed; each
    /// information element value keeps wire order so that downstream cut
    /// operations see the bytes as captured. IE parsing stops early, without
    /// error, on a zero declared length or on an element that would run past
    /// the buffer; elements decoded before the stop stay available.
    pub fn decode(body: &[u8]) -> Result<Self> {
        if body.len() < BEACON_BODY_FIXED_LENGTH {
            return Err(ApWatchError::BufferTooShort(format!(
                "{} byte beacon body, {} needed for fixed fields",
                body.len(),
                BEACON_BODY_FIXED_LENGTH
            )));
        }

        let timestamp = BigNumber::from_buffer_reversed(&body[0..], 8)?;
        let beacon_interval = BigNumber::from_buffer_reversed(&body[8..], 2)?;
        let capabilities_information = BigNumber::from_buffer_reversed(&body[10..], 2)?;

        let mut elements = InformationElementList::new();
        let mut cursor = BEACON_BODY_FIXED_LENGTH;

        while cursor + 2 <= body.len() {
            let tag = body[cursor];
            let length = body[cursor + 1] as usize;

            // Zero length marks the end of meaningful elements.
            if length == 0 {
                break;
            }
            // Tolerate a truncated trailing element.
            if cursor + 2 + length > body.len() {
                break;
            }

            elements.push(tag, BigNumber::from_buffer(&body[cursor + 2..], length)?);
            cursor += 2 + length;
        }

        Ok(Self {
            timestamp,
            beacon_interval,
            capabilities_information,
            elements,
        })
    }

    /// Resolve a beacon field name: the three fixed fields by name, `"ssid"`
    /// as an alias for the tag-0 element, anything else as a hex-encoded
    /// element tag. A miss is the null value.
    pub fn get_value(&self, field: &str) -> BigNumber {
        match field {
            "timestamp" => self.timestamp.clone(),
            "beacon_interval" => self.beacon_interval.clone(),
            "capabilities_information" => self.capabilities_information.clone(),
            "ssid" => self
                .elements
                .get(IE_TAG_SSID)
                .map(|element| element.value.clone())
                .unwrap_or_else(BigNumber::null),
            other => self.elements.get_value(other),
        }
    }

    /// Decoded information elements, wire order.
    pub fn elements(&self) -> &InformationElementList {
        &self.elements
    }
}

impl fmt::Display for BeaconBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = |n: &BigNumber| n.to_hex_string().unwrap_or_default();

        writeln!(f, "Beacon body :")?;
        writeln!(f, "Fixed parameters :")?;
        writeln!(f, "├─{:-<30}: {}", "Timestamp", hex(&self.timestamp))?;
        writeln!(f, "├─{:-<30}: {}", "Beacon Interval", hex(&self.beacon_interval))?;
        writeln!(
            f,
            "└─{:-<30}: {}",
            "Capabilities Information",
            hex(&self.capabilities_information)
        )?;
        writeln!(f)?;
        writeln!(f, "IEs :")?;
        write!(f, "{}", self.elements)
    }
}
