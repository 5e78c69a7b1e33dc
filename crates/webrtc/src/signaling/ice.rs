//! ICE candidate wire payload
//!
//! Candidates cross the signaling channel as the `ICE` envelope payload
//! `"<sdp_mid>$<sdp_mline_index>$<candidate>"`. The candidate string may
//! itself contain spaces, which is why the envelope payload is split on
//! `$` and never on whitespace.

use crate::{Error, Result};
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;

/// Field separator inside the `ICE` payload
pub const ICE_SEPARATOR: char = '$';

/// A decoded `ICE` payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceCandidatePayload {
    pub sdp_mid: String,
    pub sdp_mline_index: u16,
    pub candidate: String,
}

impl IceCandidatePayload {
    /// Build a payload from an engine candidate
    ///
    /// The engine may omit mid/mline on end-of-candidates markers; those
    /// never travel over signaling.
    pub fn from_init(init: &RTCIceCandidateInit) -> Result<Self> {
        let sdp_mid = init
            .sdp_mid
            .clone()
            .ok_or_else(|| Error::InvalidIcePayload("candidate without sdp_mid".to_string()))?;
        let sdp_mline_index = init
            .sdp_mline_index
            .ok_or_else(|| Error::InvalidIcePayload("candidate without sdp_mline_index".to_string()))?;
        Ok(Self {
            sdp_mid,
            sdp_mline_index,
            candidate: init.candidate.clone(),
        })
    }

    /// Encode into the `$`-separated wire form
    pub fn encode(&self) -> String {
        format!(
            "{}{ICE_SEPARATOR}{}{ICE_SEPARATOR}{}",
            self.sdp_mid, self.sdp_mline_index, self.candidate
        )
    }

    /// Parse the `$`-separated wire form
    pub fn parse(text: &str) -> Result<Self> {
        let mut parts = text.splitn(3, ICE_SEPARATOR);
        let (Some(sdp_mid), Some(index), Some(candidate)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::InvalidIcePayload(text.to_string()));
        };
        let sdp_mline_index = index
            .parse::<u16>()
            .map_err(|_| Error::InvalidIcePayload(text.to_string()))?;
        Ok(Self {
            sdp_mid: sdp_mid.to_string(),
            sdp_mline_index,
            candidate: candidate.to_string(),
        })
    }

    /// Convert into the engine's candidate-init shape
    pub fn into_init(self) -> RTCIceCandidateInit {
        RTCIceCandidateInit {
            candidate: self.candidate,
            sdp_mid: Some(self.sdp_mid),
            sdp_mline_index: Some(self.sdp_mline_index),
            username_fragment: None,
        }
    }
}
