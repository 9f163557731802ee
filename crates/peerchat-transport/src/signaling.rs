//! Out-of-band signaling exchange.
//!
//! Before a peer-to-peer connection can carry data, the two sides swap a
//! session description and a list of network candidates through some other
//! channel. In peerchat that's a single request/response: the client posts
//! its offer and gets back the remote description plus candidates.
//!
//! The payloads are opaque to peerchat. These types only fix their JSON
//! shape, which follows the browser's `RTCSessionDescriptionInit` and
//! `RTCIceCandidateInit` dictionaries so a web client and a native client
//! can share one signaling endpoint.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::TransportError;

/// Which side of the offer/answer exchange a description belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
    Pranswer,
    Rollback,
}

/// A session description: `{ "type": "offer", "sdp": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// A network candidate for the peer connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(rename = "sdpMid", default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(
        rename = "sdpMLineIndex",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sdp_mline_index: Option<u16>,
}

/// What the remote side sends back for an offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalingAnswer {
    pub description: SessionDescription,
    #[serde(default)]
    pub candidates: Vec<IceCandidate>,
}

/// Performs the signaling round-trip on behalf of a transport.
///
/// Implement this with whatever carries your signaling (an HTTP `POST`,
/// a WebSocket, a test stub). Transports call it once from
/// [`ChannelTransport::connect`](crate::ChannelTransport::connect).
pub trait Signaler: Send + Sync + 'static {
    /// Sends the local offer and returns the remote answer.
    ///
    /// # Errors
    /// Returns [`TransportError::Signaling`] if the exchange fails.
    fn exchange(
        &self,
        offer: SessionDescription,
    ) -> impl Future<Output = Result<SignalingAnswer, TransportError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offer_json_format() {
        let offer = SessionDescription::offer("v=0");
        let json: serde_json::Value = serde_json::to_value(&offer).unwrap();
        assert_eq!(json["type"], "offer");
        assert_eq!(json["sdp"], "v=0");
    }

    #[test]
    fn test_answer_deserializes_from_browser_shape() {
        let json = r#"{
            "description": { "type": "answer", "sdp": "v=0 remote" },
            "candidates": [
                { "candidate": "candidate:1 1 udp 1 10.0.0.1 5000 typ host",
                  "sdpMid": "0", "sdpMLineIndex": 0 }
            ]
        }"#;
        let answer: SignalingAnswer = serde_json::from_str(json).unwrap();
        assert_eq!(answer.description.sdp_type, SdpType::Answer);
        assert_eq!(answer.candidates.len(), 1);
        assert_eq!(answer.candidates[0].sdp_mid.as_deref(), Some("0"));
        assert_eq!(answer.candidates[0].sdp_mline_index, Some(0));
    }

    #[test]
    fn test_candidates_default_to_empty() {
        let json = r#"{ "description": { "type": "answer", "sdp": "" } }"#;
        let answer: SignalingAnswer = serde_json::from_str(json).unwrap();
        assert!(answer.candidates.is_empty());
    }

    #[test]
    fn test_candidate_omits_missing_fields() {
        let candidate = IceCandidate {
            candidate: "c".into(),
            sdp_mid: None,
            sdp_mline_index: None,
        };
        let json = serde_json::to_string(&candidate).unwrap();
        assert_eq!(json, r#"{"candidate":"c"}"#);
    }

    #[test]
    fn test_unknown_sdp_type_is_rejected() {
        let json = r#"{ "type": "hello", "sdp": "" }"#;
        let result: Result<SessionDescription, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
