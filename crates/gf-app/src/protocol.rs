//! Datagram wire format.
//!
//! Every datagram is one JSON object tagged by `"type"`:
//! `{"type": "request"}` is answered with a [`StateReply`];
//! `{"type": "implement_setpoint", "bus_index": 2, "P": -1000.0, "Q": 0.0}`
//! is queued for the next update cycle and never answered.

use gf_solver::GridState;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Largest datagram the intake reads.
pub const MAX_DATAGRAM: usize = 20_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    Request,
    ImplementSetpoint {
        bus_index: usize,
        #[serde(rename = "P")]
        p: f64,
        #[serde(rename = "Q")]
        q: f64,
    },
}

/// Published grid state as sent to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateReply {
    #[serde(rename = "P")]
    pub p: Vec<f64>,
    #[serde(rename = "Q")]
    pub q: Vec<f64>,
    #[serde(rename = "Vm")]
    pub vm: Vec<f64>,
    #[serde(rename = "Va")]
    pub va: Vec<f64>,
    #[serde(rename = "LineCurrents")]
    pub line_currents: Vec<f64>,
}

impl From<&GridState> for StateReply {
    fn from(state: &GridState) -> Self {
        Self {
            p: state.p.clone(),
            q: state.q.clone(),
            vm: state.vm.clone(),
            va: state.va.clone(),
            line_currents: state.line_currents.clone(),
        }
    }
}

pub fn decode_message(bytes: &[u8]) -> AppResult<Message> {
    let value: serde_json::Value = serde_json::from_slice(bytes)?;
    let kind = match value.get("type") {
        Some(serde_json::Value::String(kind)) => kind.clone(),
        Some(other) => {
            return Err(AppError::Transport(format!("message type {other} is not a string")));
        }
        None => return Err(AppError::Transport("message has no type".to_string())),
    };
    serde_json::from_value(value)
        .map_err(|e| AppError::Transport(format!("bad '{kind}' message: {e}")))
}

pub fn encode<T: Serialize>(message: &T) -> AppResult<Vec<u8>> {
    Ok(serde_json::to_vec(message)?)
}

pub fn decode_state(bytes: &[u8]) -> AppResult<StateReply> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_request() {
        assert_eq!(decode_message(br#"{"type":"request"}"#).unwrap(), Message::Request);
    }

    #[test]
    fn decodes_setpoint() {
        let msg = decode_message(br#"{"type":"implement_setpoint","bus_index":2,"P":-1000.5,"Q":12}"#)
            .unwrap();
        assert_eq!(
            msg,
            Message::ImplementSetpoint {
                bus_index: 2,
                p: -1000.5,
                q: 12.0
            }
        );
    }

    #[test]
    fn setpoint_encoding_uses_wire_names() {
        let bytes = encode(&Message::ImplementSetpoint {
            bus_index: 1,
            p: 5.0,
            q: -1.0,
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["type"], "implement_setpoint");
        assert_eq!(value["bus_index"], 1);
        assert_eq!(value["P"], 5.0);
        assert_eq!(value["Q"], -1.0);
    }

    #[test]
    fn rejects_malformed_messages() {
        for bytes in [
            &b"not json"[..],
            br#"{"kind":"request"}"#,
            br#"{"type":"reboot"}"#,
            br#"{"type":7}"#,
            br#"{"type":"implement_setpoint","bus_index":-1,"P":0,"Q":0}"#,
            br#"{"type":"implement_setpoint","bus_index":1,"P":0}"#,
        ] {
            assert!(matches!(decode_message(bytes), Err(AppError::Transport(_))));
        }
    }

    #[test]
    fn state_reply_keys() {
        let state = GridState {
            p: vec![1.0, -1.0],
            q: vec![0.0, 0.0],
            vm: vec![230.0, 229.0],
            va: vec![0.0, -0.1],
            line_currents: vec![4.3],
            line_losses: vec![0.01],
        };
        let bytes = encode(&StateReply::from(&state)).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        for key in ["P", "Q", "Vm", "Va", "LineCurrents"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert!(value.get("line_losses").is_none());
        assert_eq!(decode_state(&bytes).unwrap().vm, vec![230.0, 229.0]);
    }
}
