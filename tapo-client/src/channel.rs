//! Authenticated command channel
//!
//! [`SecureChannel`] owns one [`Session`] and the transport used to reach
//! the camera. Every command first makes sure a session token exists (running
//! the login handshake if not), then frames the payload either as plain JSON
//! or, for secure sessions, as an AES-encrypted `securePassthrough` envelope
//! tagged with the sequence number and an integrity hash.
//!
//! An invalid-token answer clears the token and is returned as an error; the
//! failing command is not retried. The next command re-runs the handshake.

use crate::commands::Command;
use crate::envelope::{ApiResponse, MultipleRequest, SecurePassthrough, SecureResponse};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use tapo_core::{CryptoError, DeviceStatus, Phase, TapoError, TapoResult};
use tapo_security::kdf::request_tag;
use tapo_session::{Session, SessionProtocol};
use tapo_transport::transport::{HEADER_SEQ, HEADER_TAG};
use tapo_transport::{ApiRequest, Transport};

/// Command channel to one camera
///
/// Not internally synchronized: every operation takes `&mut self`, so
/// concurrent use must go through an external mutex or actor.
pub struct SecureChannel {
    session: Session,
    transport: Box<dyn Transport>,
}

impl SecureChannel {
    /// Create a channel over an unauthenticated (or previously established) session
    pub fn new(session: Session, transport: Box<dyn Transport>) -> Self {
        Self { session, transport }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Take the session back, e.g. to hand it to another channel
    pub fn into_session(self) -> Session {
        self.session
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Current session token (empty when unauthenticated)
    pub fn session_token(&self) -> &str {
        self.session.session_token()
    }

    /// Run the login handshake now
    ///
    /// # Errors
    /// Returns the error of the failing handshake phase; the session is left
    /// unauthenticated.
    pub async fn authenticate(&mut self) -> TapoResult<()> {
        SessionProtocol::new(self.transport.as_ref())
            .authenticate(&mut self.session)
            .await
    }

    /// Send one named command wrapped in a `multipleRequest` batch
    ///
    /// # Returns
    /// The batch result document (`{"responses": [...]}`); see
    /// [`first_response`](crate::envelope::first_response).
    pub async fn execute(&mut self, method: &str, params: Value) -> TapoResult<Value> {
        let request = MultipleRequest::single(method, params);
        self.dispatch(&request).await
    }

    /// Send an already shaped payload unchanged
    pub async fn execute_direct(&mut self, payload: &Value) -> TapoResult<Value> {
        self.dispatch(payload).await
    }

    /// Send a catalogue command through the matching entry point
    pub async fn send(&mut self, command: &Command) -> TapoResult<Value> {
        match command {
            Command::Batched { method, params } => self.execute(method, params.clone()).await,
            Command::Direct(payload) => self.execute_direct(payload).await,
        }
    }

    async fn dispatch<P>(&mut self, payload: &P) -> TapoResult<Value>
    where
        P: Serialize + Sync + ?Sized,
    {
        if !self.session.is_authenticated() {
            log::debug!("No session token for {}, authenticating", self.session.host());
            self.authenticate().await?;
        }

        let body = serde_json::to_string(payload)
            .map_err(|e| TapoError::serialization(Phase::Dispatch, e))?;

        if self.session.is_secure() {
            self.dispatch_secure(body).await
        } else {
            self.dispatch_plain(body).await
        }
    }

    async fn dispatch_plain(&mut self, body: String) -> TapoResult<Value> {
        let request = ApiRequest::new(self.session.host(), self.session.endpoint(), body);
        let response = self.post(request).await?;

        let response: ApiResponse = serde_json::from_slice(&response)
            .map_err(|e| TapoError::serialization(Phase::Dispatch, e))?;
        self.check_status(Phase::Dispatch, response.error_code)?;
        Ok(response.result)
    }

    async fn dispatch_secure(&mut self, body: String) -> TapoResult<Value> {
        let keys = self.session.keys().cloned().ok_or(TapoError::Crypto {
            phase: Phase::Dispatch,
            source: CryptoError::InvalidKeyMaterial { what: "key", len: 0 },
        })?;

        let ciphertext = keys
            .encrypt(body.as_bytes())
            .map_err(|e| TapoError::crypto(Phase::Dispatch, e))?;
        let envelope = SecurePassthrough::new(STANDARD.encode(ciphertext));
        let envelope = serde_json::to_string(&envelope)
            .map_err(|e| TapoError::serialization(Phase::Dispatch, e))?;

        let seq = self.session.next_sequence();
        let tag = request_tag(
            self.session.hashed_password(),
            self.session.client_nonce(),
            &envelope,
            seq,
        );
        log::debug!("Secure request to {} with seq {}", self.session.host(), seq);

        let request = ApiRequest::new(self.session.host(), self.session.endpoint(), envelope)
            .with_header(HEADER_SEQ, seq.to_string())
            .with_header(HEADER_TAG, tag);
        let response = self.post(request).await?;

        let response: SecureResponse = serde_json::from_slice(&response)
            .map_err(|e| TapoError::serialization(Phase::Dispatch, e))?;
        self.check_status(Phase::Dispatch, response.error_code)?;

        if response.result.response.is_empty() {
            return Err(TapoError::malformed(Phase::Decrypt, "missing encrypted response"));
        }
        let ciphertext = STANDARD
            .decode(response.result.response.as_bytes())
            .map_err(|e| TapoError::malformed(Phase::Decrypt, format!("invalid base64: {}", e)))?;
        let plaintext = keys
            .decrypt(&ciphertext)
            .map_err(|e| TapoError::crypto(Phase::Decrypt, e))?;

        let inner: ApiResponse = serde_json::from_slice(&plaintext)
            .map_err(|e| TapoError::serialization(Phase::Decrypt, e))?;
        self.check_status(Phase::Dispatch, inner.error_code)?;
        Ok(inner.result)
    }

    async fn post(&self, request: ApiRequest) -> TapoResult<Bytes> {
        self.transport
            .post(request)
            .await
            .map_err(|e| TapoError::transport(Phase::Dispatch, e))
    }

    /// Map a non-zero status to an error, dropping the token if it expired
    fn check_status(&mut self, phase: Phase, code: i32) -> TapoResult<()> {
        if code == DeviceStatus::SUCCESS {
            return Ok(());
        }
        if code == DeviceStatus::INVALID_TOKEN {
            log::warn!("Session token for {} expired", self.session.host());
            self.session.invalidate();
        }
        Err(TapoError::device(phase, code))
    }
}

impl std::fmt::Debug for SecureChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureChannel")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::first_response;
    use async_trait::async_trait;
    use mockall::{mock, Sequence};
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use tapo_core::TransportError;
    use tapo_security::kdf::{device_confirm, digest_password};
    use tapo_security::{md5_hex, sha256_hex, SessionKeys};
    use tapo_transport::Endpoint;

    mock! {
        pub Device {}

        #[async_trait]
        impl Transport for Device {
            async fn post(&self, request: ApiRequest) -> Result<Bytes, TransportError>;
        }
    }

    fn reply(value: Value) -> Result<Bytes, TransportError> {
        Ok(Bytes::from(value.to_string()))
    }

    fn body(request: &ApiRequest) -> Value {
        serde_json::from_slice(request.body()).unwrap()
    }

    const SERVER_NONCE: &str = "53CB1E7F0A9D2C44";
    const START_SEQ: i64 = 1000;

    #[derive(Default)]
    struct CameraState {
        cnonce: String,
        token: String,
        keys: Option<SessionKeys>,
        expected_seq: i64,
        logins: usize,
        handshakes: usize,
        commands: Vec<Value>,
        inner_error: Option<i32>,
        offline: bool,
    }

    /// Camera answering the secure handshake and encrypted commands
    #[derive(Clone)]
    struct SimulatedCamera {
        password_hash: String,
        state: Arc<Mutex<CameraState>>,
    }

    impl SimulatedCamera {
        fn new(password: &str) -> Self {
            Self {
                password_hash: sha256_hex(password),
                state: Arc::new(Mutex::new(CameraState::default())),
            }
        }

        fn state(&self) -> std::sync::MutexGuard<'_, CameraState> {
            self.state.lock().unwrap()
        }

        fn login(&self, request: &Value) -> Value {
            let params = &request["params"];
            let mut state = self.state();
            state.logins += 1;

            if let Some(digest) = params.get("digest_passwd").and_then(Value::as_str) {
                let cnonce = state.cnonce.clone();
                if digest != digest_password(&self.password_hash, &cnonce, SERVER_NONCE) {
                    return json!({"error_code": -40411});
                }
                state.handshakes += 1;
                state.token = format!("stok-{}", state.handshakes);
                state.keys = Some(SessionKeys::derive(&cnonce, SERVER_NONCE, &self.password_hash));
                state.expected_seq = START_SEQ;
                json!({"error_code": 0, "result": {"stok": state.token, "user_group": "root", "start_seq": START_SEQ}})
            } else if let Some(cnonce) = params.get("cnonce").and_then(Value::as_str) {
                state.cnonce = cnonce.to_string();
                json!({"error_code": 0, "result": {"data": {
                    "code": 0,
                    "encrypt_type": ["3"],
                    "nonce": SERVER_NONCE,
                    "device_confirm": device_confirm(cnonce, SERVER_NONCE, &self.password_hash),
                }}})
            } else {
                json!({"error_code": -40413, "result": {"data": {"code": -40413, "encrypt_type": ["3"]}}})
            }
        }

        fn command(&self, token: &str, request: &ApiRequest) -> Value {
            let mut state = self.state();
            if token != state.token {
                return json!({"error_code": -40401});
            }
            let Some(keys) = state.keys.clone() else {
                return json!({"error_code": -1});
            };

            let seq: i64 = request.header(HEADER_SEQ).unwrap().parse().unwrap();
            assert_eq!(seq, state.expected_seq, "sequence must advance by one");
            let envelope = std::str::from_utf8(request.body()).unwrap();
            let expected_tag = request_tag(&self.password_hash, &state.cnonce, envelope, seq);
            assert_eq!(request.header(HEADER_TAG), Some(expected_tag.as_str()));
            state.expected_seq += 1;

            let envelope: SecurePassthrough = serde_json::from_str(envelope).unwrap();
            assert_eq!(envelope.method, "securePassthrough");
            let ciphertext = STANDARD.decode(envelope.params.request).unwrap();
            let inner: Value = serde_json::from_slice(&keys.decrypt(&ciphertext).unwrap()).unwrap();
            state.commands.push(inner.clone());

            let response = match state.inner_error {
                Some(code) => json!({"error_code": code}),
                None => json!({"error_code": 0, "result": {"responses": [
                    {"method": inner["params"]["requests"][0]["method"], "result": {"echo": inner}, "error_code": 0}
                ]}}),
            };
            let encrypted = keys.encrypt(response.to_string().as_bytes()).unwrap();
            json!({"error_code": 0, "result": {"response": STANDARD.encode(encrypted)}})
        }
    }

    #[async_trait]
    impl Transport for SimulatedCamera {
        async fn post(&self, request: ApiRequest) -> Result<Bytes, TransportError> {
            let response = match request.endpoint() {
                Endpoint::Login => self.login(&body(&request)),
                Endpoint::Session(_) if self.state().offline => return Err(TransportError::Timeout),
                Endpoint::Session(token) => self.command(token, &request),
            };
            reply(response)
        }
    }

    fn secure_channel(camera: &SimulatedCamera, password: &str) -> SecureChannel {
        SecureChannel::new(
            Session::new("10.0.0.2", "admin", password),
            Box::new(camera.clone()),
        )
    }

    #[tokio::test]
    async fn test_secure_execute_authenticates_first() {
        let camera = SimulatedCamera::new("secret");
        let mut channel = secure_channel(&camera, "secret");
        assert!(!channel.is_authenticated());

        let result = channel.send(&Command::get_device_info()).await.unwrap();

        assert!(channel.is_authenticated());
        assert_eq!(channel.session_token(), "stok-1");
        assert!(channel.session().is_secure());
        assert_eq!(channel.session().user_group(), Some("root"));
        assert_eq!(channel.session().sequence(), START_SEQ + 1);

        let echo = first_response(result).unwrap();
        assert_eq!(
            echo["echo"],
            json!({
                "method": "multipleRequest",
                "params": {"requests": [
                    {"method": "getDeviceInfo", "params": {"device_info": {"name": ["basic_info"]}}}
                ]}
            })
        );
    }

    #[tokio::test]
    async fn test_secure_sequence_advances_per_request() {
        let camera = SimulatedCamera::new("secret");
        let mut channel = secure_channel(&camera, "secret");

        channel.execute("getLedStatus", json!({"led": {"name": ["config"]}})).await.unwrap();
        channel.execute("getClockStatus", json!({"system": {"name": "clock_status"}})).await.unwrap();
        let payload = json!({"method": "do", "motor": {"manual_cali": ""}});
        let result = channel.execute_direct(&payload).await.unwrap();

        assert_eq!(channel.session().sequence(), START_SEQ + 3);
        assert_eq!(camera.state().logins, 3);
        assert_eq!(camera.state().commands.len(), 3);
        // direct payloads reach the camera unchanged
        assert_eq!(camera.state().commands[2], payload);
        assert!(result["responses"].is_array());
    }

    #[tokio::test]
    async fn test_secure_wrong_password_sends_no_command() {
        let camera = SimulatedCamera::new("secret");
        let mut channel = secure_channel(&camera, "not-the-password");

        let err = channel.send(&Command::reboot()).await.unwrap_err();

        assert!(matches!(
            err,
            TapoError::AuthenticationFailed { phase: Phase::SecurePhase2, .. }
        ));
        assert!(!channel.is_authenticated());
        assert!(camera.state().commands.is_empty());
        // detection and phase 1 only
        assert_eq!(camera.state().logins, 2);
    }

    #[tokio::test]
    async fn test_secure_expired_token_reauthenticates_on_next_call() {
        let camera = SimulatedCamera::new("secret");
        let mut channel = secure_channel(&camera, "secret");
        channel.send(&Command::get_led_status()).await.unwrap();

        // the camera forgets the session
        camera.state().token = "rotated".into();

        let err = channel.send(&Command::get_led_status()).await.unwrap_err();
        assert!(err.is_session_expired());
        assert_eq!(err.phase(), Some(Phase::Dispatch));
        assert!(!channel.is_authenticated());
        assert_eq!(channel.session().sequence(), START_SEQ + 2);

        channel.send(&Command::get_led_status()).await.unwrap();
        assert_eq!(channel.session_token(), "stok-2");
        assert_eq!(channel.session().sequence(), START_SEQ + 1);
        assert_eq!(camera.state().commands.len(), 2);
    }

    #[tokio::test]
    async fn test_secure_inner_error_status() {
        let camera = SimulatedCamera::new("secret");
        let mut channel = secure_channel(&camera, "secret");
        channel.authenticate().await.unwrap();
        camera.state().inner_error = Some(-64303);

        let err = channel.send(&Command::cruise_start()).await.unwrap_err();
        assert_eq!(err.device_status(), Some(DeviceStatus::CruiseInProgress));
        assert!(channel.is_authenticated());
    }

    #[tokio::test]
    async fn test_secure_inner_invalid_token_clears_session() {
        let camera = SimulatedCamera::new("secret");
        let mut channel = secure_channel(&camera, "secret");
        channel.authenticate().await.unwrap();
        camera.state().inner_error = Some(-40401);

        let err = channel.send(&Command::get_led_status()).await.unwrap_err();
        assert!(err.is_session_expired());
        assert_eq!(err.phase(), Some(Phase::Dispatch));
        assert!(!channel.is_authenticated());
        assert_eq!(camera.state().handshakes, 1);

        camera.state().inner_error = None;
        channel.send(&Command::get_led_status()).await.unwrap();
        assert_eq!(camera.state().handshakes, 2);
        assert_eq!(channel.session_token(), "stok-2");
        assert_eq!(channel.session().sequence(), START_SEQ + 1);
    }

    #[tokio::test]
    async fn test_secure_transport_error_after_authentication() {
        let camera = SimulatedCamera::new("secret");
        let mut channel = secure_channel(&camera, "secret");
        channel.authenticate().await.unwrap();
        camera.state().offline = true;

        let err = channel.send(&Command::get_clock_status()).await.unwrap_err();
        assert!(matches!(
            err,
            TapoError::Transport { phase: Phase::Dispatch, source: TransportError::Timeout }
        ));
        // the sequence number was spent on the lost request
        assert_eq!(channel.session().sequence(), START_SEQ + 1);
        assert!(channel.is_authenticated());
        assert_eq!(channel.session_token(), "stok-1");

        // the camera skips the lost sequence number as well
        camera.state().offline = false;
        camera.state().expected_seq = START_SEQ + 1;
        channel.send(&Command::get_clock_status()).await.unwrap();
        assert_eq!(channel.session().sequence(), START_SEQ + 2);
        assert_eq!(camera.state().handshakes, 1);
    }

    #[tokio::test]
    async fn test_secure_outer_invalid_token_with_null_result() {
        let camera = SimulatedCamera::new("secret");
        let mut channel = secure_channel(&camera, "secret");
        channel.authenticate().await.unwrap();

        let session = channel.into_session();
        let mut device = MockDevice::new();
        device
            .expect_post()
            .times(1)
            .returning(|_| reply(json!({"error_code": -40401, "result": null})));
        let mut channel = SecureChannel::new(session, Box::new(device));

        let err = channel.send(&Command::get_led_status()).await.unwrap_err();
        assert!(err.is_session_expired());
        assert!(!channel.is_authenticated());
    }

    #[tokio::test]
    async fn test_secure_undecryptable_response() {
        let camera = SimulatedCamera::new("secret");
        let mut channel = secure_channel(&camera, "secret");
        channel.authenticate().await.unwrap();

        // swap in a device that answers with a ciphertext that is not block aligned
        let session = channel.into_session();
        let mut device = MockDevice::new();
        device
            .expect_post()
            .times(1)
            .returning(|_| reply(json!({"error_code": 0, "result": {"response": "QUJDREVGRw=="}})));
        let mut channel = SecureChannel::new(session, Box::new(device));

        let err = channel.send(&Command::get_clock_status()).await.unwrap_err();
        assert!(matches!(
            err,
            TapoError::Crypto { phase: Phase::Decrypt, source: CryptoError::InvalidCiphertextLength(7) }
        ));
        assert!(channel.is_authenticated());
    }

    #[tokio::test]
    async fn test_secure_bad_base64_response() {
        let camera = SimulatedCamera::new("secret");
        let mut channel = secure_channel(&camera, "secret");
        channel.authenticate().await.unwrap();

        let session = channel.into_session();
        let mut device = MockDevice::new();
        device
            .expect_post()
            .times(1)
            .returning(|_| reply(json!({"error_code": 0, "result": {"response": "%%%"}})));
        let mut channel = SecureChannel::new(session, Box::new(device));

        let err = channel.send(&Command::get_clock_status()).await.unwrap_err();
        assert!(matches!(err, TapoError::MalformedResponse { phase: Phase::Decrypt, .. }));
    }

    /// Expect mode detection followed by a successful legacy login
    fn expect_legacy_login(device: &mut MockDevice, seq: &mut Sequence, token: &'static str) {
        device
            .expect_post()
            .times(1)
            .in_sequence(seq)
            .withf(|request| request.endpoint() == &Endpoint::Login && body(request)["params"]["hashed"].is_null())
            .returning(|_| reply(json!({"error_code": -40413, "result": {}})));
        device
            .expect_post()
            .times(1)
            .in_sequence(seq)
            .withf(|request| body(request)["params"]["password"] == md5_hex("secret").as_str())
            .returning(move |_| reply(json!({"error_code": 0, "result": {"stok": token}})));
    }

    fn legacy_channel(device: MockDevice) -> SecureChannel {
        SecureChannel::new(Session::new("10.0.0.3", "admin", "secret"), Box::new(device))
    }

    #[tokio::test]
    async fn test_legacy_execute_reuses_session() {
        let mut device = MockDevice::new();
        let mut seq = Sequence::new();
        expect_legacy_login(&mut device, &mut seq, "legacy-1");
        device
            .expect_post()
            .times(2)
            .in_sequence(&mut seq)
            .withf(|request| {
                request.endpoint() == &Endpoint::Session("legacy-1".into())
                    && request.header(HEADER_SEQ).is_none()
                    && body(request)["method"] == "multipleRequest"
            })
            .returning(|_| reply(json!({"error_code": 0, "result": {"responses": [{"method": "getLedStatus", "result": {}, "error_code": 0}]}})));

        let mut channel = legacy_channel(device);
        channel.send(&Command::get_led_status()).await.unwrap();
        assert!(channel.is_authenticated());
        channel.send(&Command::get_led_status()).await.unwrap();

        assert!(!channel.session().is_secure());
        assert!(channel.session().keys().is_none());
    }

    #[tokio::test]
    async fn test_legacy_token_expiry_then_reauthentication() {
        let mut device = MockDevice::new();
        let mut seq = Sequence::new();
        expect_legacy_login(&mut device, &mut seq, "legacy-1");
        device
            .expect_post()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| reply(json!({"error_code": -40401})));
        expect_legacy_login(&mut device, &mut seq, "legacy-2");
        device
            .expect_post()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|request| request.endpoint() == &Endpoint::Session("legacy-2".into()))
            .returning(|_| reply(json!({"error_code": 0, "result": {"responses": []}})));

        let mut channel = legacy_channel(device);
        let err = channel.send(&Command::get_preset_config()).await.unwrap_err();
        assert!(err.is_session_expired());
        assert!(!channel.is_authenticated());
        assert_eq!(channel.session_token(), "");

        channel.send(&Command::get_preset_config()).await.unwrap();
        assert_eq!(channel.session_token(), "legacy-2");
    }

    #[tokio::test]
    async fn test_legacy_other_error_keeps_token() {
        let mut device = MockDevice::new();
        let mut seq = Sequence::new();
        expect_legacy_login(&mut device, &mut seq, "legacy-1");
        device
            .expect_post()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| reply(json!({"error_code": -40404})));

        let mut channel = legacy_channel(device);
        let err = channel.send(&Command::reboot()).await.unwrap_err();
        assert_eq!(err.device_status(), Some(DeviceStatus::RateLimited));
        assert!(channel.is_authenticated());
    }

    #[tokio::test]
    async fn test_authentication_failure_sends_nothing() {
        let mut device = MockDevice::new();
        device
            .expect_post()
            .times(1)
            .returning(|_| Err(TransportError::Timeout));

        let mut channel = legacy_channel(device);
        let err = channel.execute("getDeviceInfo", Value::Null).await.unwrap_err();
        assert!(matches!(
            err,
            TapoError::Transport { phase: Phase::Detection, source: TransportError::Timeout }
        ));
    }

    #[tokio::test]
    async fn test_dispatch_transport_error() {
        let mut device = MockDevice::new();
        let mut seq = Sequence::new();
        expect_legacy_login(&mut device, &mut seq, "legacy-1");
        device
            .expect_post()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(TransportError::Request("connection reset".into())));

        let mut channel = legacy_channel(device);
        let err = channel.send(&Command::motor_calibrate()).await.unwrap_err();
        assert_eq!(err.phase(), Some(Phase::Dispatch));
        assert!(channel.is_authenticated());
    }
}
