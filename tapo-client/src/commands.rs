//! Camera command catalogue
//!
//! Most camera features are reached through a named method wrapped in a
//! `multipleRequest` batch ([`Command::Batched`]). Motor, alarm and module
//! queries use the `get`/`set`/`do` verbs and are sent unwrapped
//! ([`Command::Direct`]).

use serde_json::{json, Value};
use tapo_core::{TapoError, TapoResult};

/// Largest accepted step direction in degrees
pub const MAX_DIRECTION: u16 = 359;

/// A camera command ready to be sent through a channel
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Named method sent inside a batch
    Batched { method: &'static str, params: Value },
    /// Payload sent as is
    Direct(Value),
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

impl Command {
    fn batched(method: &'static str, params: Value) -> Self {
        Command::Batched { method, params }
    }

    /// Method name of a batched command, or the verb of a direct payload
    pub fn method(&self) -> Option<&str> {
        match self {
            Command::Batched { method, .. } => Some(method),
            Command::Direct(payload) => payload.get("method").and_then(Value::as_str),
        }
    }

    pub fn get_device_info() -> Self {
        Self::batched("getDeviceInfo", json!({"device_info": {"name": ["basic_info"]}}))
    }

    pub fn get_clock_status() -> Self {
        Self::batched("getClockStatus", json!({"system": {"name": "clock_status"}}))
    }

    pub fn get_led_status() -> Self {
        Self::batched("getLedStatus", json!({"led": {"name": ["config"]}}))
    }

    pub fn set_led_status(enabled: bool) -> Self {
        Self::batched(
            "setLedStatus",
            json!({"led": {"config": {"enabled": on_off(enabled)}}}),
        )
    }

    pub fn get_lens_mask_config() -> Self {
        Self::batched("getLensMaskConfig", json!({"lens_mask": {"name": ["lens_mask_info"]}}))
    }

    /// Turn the privacy lens mask on or off
    pub fn set_lens_mask_config(enabled: bool) -> Self {
        Self::batched(
            "setLensMaskConfig",
            json!({"lens_mask": {"lens_mask_info": {"enabled": on_off(enabled)}}}),
        )
    }

    pub fn get_last_alarm_info() -> Self {
        Self::batched(
            "getLastAlarmInfo",
            json!({"msg_alarm": {"name": ["chn1_msg_alarm_info"]}}),
        )
    }

    pub fn get_preset_config() -> Self {
        Self::batched("getPresetConfig", json!({"preset": {"name": ["preset"]}}))
    }

    /// Move the lens to a saved preset
    pub fn goto_preset(id: &str) -> Self {
        Self::batched("motorMoveToPreset", json!({"preset": {"goto_preset": {"id": id}}}))
    }

    /// Save the current lens position as a named preset
    pub fn save_preset(name: &str) -> Self {
        // method name is misspelled on the device side
        Self::batched(
            "addMotorPostion",
            json!({"preset": {"set_preset": {"name": name, "save_ptz": "1"}}}),
        )
    }

    pub fn delete_preset(id: &str) -> Self {
        Self::batched("deletePreset", json!({"preset": {"remove_preset": {"id": [id]}}}))
    }

    pub fn reboot() -> Self {
        Self::batched("rebootDevice", json!({"system": {"reboot": "null"}}))
    }

    /// Move the lens to absolute coordinates
    pub fn motor_move(x: i32, y: i32) -> Self {
        Command::Direct(json!({
            "method": "do",
            "motor": {"move": {"x_coord": x.to_string(), "y_coord": y.to_string()}}
        }))
    }

    /// Move the lens one step in a direction
    ///
    /// # Arguments
    /// * `direction` - Degrees, 0 = right, 90 = up, 180 = left, 270 = down
    ///
    /// # Errors
    /// Returns [`TapoError::InvalidConfig`] if `direction` is above 359.
    pub fn motor_step(direction: u16) -> TapoResult<Self> {
        if direction > MAX_DIRECTION {
            return Err(TapoError::InvalidConfig(format!(
                "direction must be between 0 and {}, got {}",
                MAX_DIRECTION, direction
            )));
        }
        Ok(Command::Direct(json!({
            "method": "do",
            "motor": {"movestep": {"direction": format!("{:03}", direction)}}
        })))
    }

    pub fn motor_calibrate() -> Self {
        Command::Direct(json!({"method": "do", "motor": {"manual_cali": ""}}))
    }

    pub fn motor_capability() -> Self {
        Command::Direct(json!({"method": "get", "motor": {"name": ["capability"]}}))
    }

    pub fn cruise_start() -> Self {
        Command::Direct(json!({"method": "do", "motor": {"cruise": {"coord": "0"}}}))
    }

    pub fn cruise_stop() -> Self {
        Command::Direct(json!({"method": "do", "motor": {"cruise_stop": {}}}))
    }

    /// Start or stop the siren/light alarm manually
    pub fn manual_alarm(start: bool) -> Self {
        let action = if start { "start" } else { "stop" };
        Command::Direct(json!({
            "method": "do",
            "msg_alarm": {"manual_msg_alarm": {"action": action}}
        }))
    }

    pub fn module_spec() -> Self {
        Command::Direct(json!({"method": "get", "function": {"name": ["module_spec"]}}))
    }
}
