//! Login handshake state machine
//!
//! [`SessionProtocol::authenticate`] detects whether the camera speaks the
//! secure (SHA-256/AES) or the legacy (MD5, unencrypted) login, runs the
//! matching login and, on success only, writes the resulting token, password
//! hash, nonces, keys and sequence number into the [`Session`].

use crate::messages::{LoginRequest, LoginResponse};
use crate::session::{Established, Session};
use tapo_core::{DeviceStatus, Phase, TapoError, TapoResult};
use tapo_security::kdf::digest_password;
use tapo_security::{generate_nonce, md5_hex, PasswordHash, SessionKeys};
use tapo_transport::{ApiRequest, Endpoint, Transport};

/// `encrypt_type` value identifying the secure login
pub const SECURE_ENCRYPT_TYPE: &str = "3";

/// Handshake state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// No valid session (initial state and state after any failure)
    Unauthenticated,
    /// Probing for secure login support
    DetectingMode,
    /// Legacy MD5 login in progress
    LegacyLogin,
    /// Waiting for the server nonce
    SecurePhase1,
    /// Validating the device confirm and deriving keys
    SecurePhase2,
    /// Submitting the password digest
    SecurePhase3,
    /// Token obtained
    Authenticated,
}

/// Output of secure phase 1
struct ServerChallenge {
    cnonce: String,
    nonce: String,
    device_confirm: String,
}

/// Output of secure phase 2
struct ValidatedPassword {
    algorithm: PasswordHash,
    hashed_password: String,
    keys: SessionKeys,
}

/// Login handshake driver
///
/// Borrows the transport for the duration of the handshake; the session is
/// passed to [`authenticate`](Self::authenticate) and only mutated once the
/// whole handshake succeeded (or cleared of its token when it failed).
pub struct SessionProtocol<'a, T: Transport + ?Sized> {
    transport: &'a T,
    state: HandshakeState,
}

impl<'a, T: Transport + ?Sized> SessionProtocol<'a, T> {
    /// Create a new handshake driver in `Unauthenticated` state
    pub fn new(transport: &'a T) -> Self {
        Self {
            transport,
            state: HandshakeState::Unauthenticated,
        }
    }

    /// Get current handshake state
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Run the full handshake against the session's camera
    ///
    /// # Errors
    /// Returns the error of the first failing phase. The session is left
    /// unauthenticated and keeps its previous nonces, keys and sequence.
    pub async fn authenticate(&mut self, session: &mut Session) -> TapoResult<()> {
        match self.run(session).await {
            Ok(established) => {
                log::info!(
                    "Authenticated with {} ({} mode)",
                    session.host(),
                    if established.secure { "secure" } else { "legacy" }
                );
                session.establish(established);
                self.state = HandshakeState::Authenticated;
                Ok(())
            }
            Err(e) => {
                log::warn!("Authentication with {} failed: {}", session.host(), e);
                session.invalidate();
                self.state = HandshakeState::Unauthenticated;
                Err(e)
            }
        }
    }

    async fn run(&mut self, session: &Session) -> TapoResult<Established> {
        if self.detect_mode(session).await? {
            self.secure_login(session).await
        } else {
            self.legacy_login(session).await
        }
    }

    /// Probe the camera for secure login support
    ///
    /// # Returns
    /// `true` if the probe is answered with "login required" and the device
    /// lists encrypt type `"3"`; `false` for any other answer.
    pub async fn detect_mode(&mut self, session: &Session) -> TapoResult<bool> {
        self.state = HandshakeState::DetectingMode;
        let request = LoginRequest::detect(session.username(), SECURE_ENCRYPT_TYPE);
        let response = self.login(Phase::Detection, session, &request).await?;

        let secure = response.error_code == DeviceStatus::LOGIN_REQUIRED
            && response.supports_encrypt_type(SECURE_ENCRYPT_TYPE);
        log::debug!(
            "Mode detection on {}: error_code={} secure={}",
            session.host(),
            response.error_code,
            secure
        );
        Ok(secure)
    }

    async fn legacy_login(&mut self, session: &Session) -> TapoResult<Established> {
        self.state = HandshakeState::LegacyLogin;
        let hashed_password = md5_hex(session.password());
        let request = LoginRequest::legacy(session.username(), &hashed_password);
        let response = self.login(Phase::LegacyLogin, session, &request).await?;

        if response.error_code != DeviceStatus::SUCCESS {
            return Err(TapoError::device(Phase::LegacyLogin, response.error_code));
        }
        let token = response
            .token()
            .ok_or_else(|| TapoError::malformed(Phase::LegacyLogin, "missing session token"))?
            .to_string();

        Ok(Established {
            token,
            secure: false,
            hashed_password,
            cnonce: String::new(),
            nonce: String::new(),
            keys: None,
            start_seq: 0,
            user_group: response.result.user_group,
        })
    }

    async fn secure_login(&mut self, session: &Session) -> TapoResult<Established> {
        let challenge = self.request_server_nonce(session).await?;
        let validated = self.validate_device(session, &challenge)?;
        self.submit_digest(session, challenge, validated).await
    }

    /// Phase 1: send a fresh client nonce, receive the server nonce
    async fn request_server_nonce(&mut self, session: &Session) -> TapoResult<ServerChallenge> {
        self.state = HandshakeState::SecurePhase1;
        let cnonce = generate_nonce();
        let request = LoginRequest::secure_nonce(session.username(), &cnonce, SECURE_ENCRYPT_TYPE);
        let response = self.login(Phase::SecurePhase1, session, &request).await?;

        if response.error_code != DeviceStatus::SUCCESS {
            return Err(TapoError::device(Phase::SecurePhase1, response.error_code));
        }
        let data = response
            .result
            .data
            .ok_or_else(|| TapoError::malformed(Phase::SecurePhase1, "missing handshake data"))?;
        let nonce = data
            .nonce
            .filter(|nonce| !nonce.is_empty())
            .ok_or_else(|| TapoError::malformed(Phase::SecurePhase1, "missing server nonce"))?;

        log::debug!("Secure login phase 1 on {} complete", session.host());
        Ok(ServerChallenge {
            cnonce,
            nonce,
            device_confirm: data.device_confirm.unwrap_or_default(),
        })
    }

    /// Phase 2: find the password hash the device uses and derive keys
    fn validate_device(
        &mut self,
        session: &Session,
        challenge: &ServerChallenge,
    ) -> TapoResult<ValidatedPassword> {
        self.state = HandshakeState::SecurePhase2;
        let (algorithm, hashed_password) = PasswordHash::select(
            session.password(),
            &challenge.cnonce,
            &challenge.nonce,
            &challenge.device_confirm,
        )
        .ok_or_else(|| TapoError::AuthenticationFailed {
            phase: Phase::SecurePhase2,
            reason: "device validation failed - check password".to_string(),
        })?;

        let keys = SessionKeys::derive(&challenge.cnonce, &challenge.nonce, &hashed_password);
        log::debug!("Secure login phase 2 on {}: device uses {:?}", session.host(), algorithm);
        Ok(ValidatedPassword {
            algorithm,
            hashed_password,
            keys,
        })
    }

    /// Phase 3: prove knowledge of the password, receive token and sequence
    async fn submit_digest(
        &mut self,
        session: &Session,
        challenge: ServerChallenge,
        validated: ValidatedPassword,
    ) -> TapoResult<Established> {
        self.state = HandshakeState::SecurePhase3;
        let digest = digest_password(&validated.hashed_password, &challenge.cnonce, &challenge.nonce);
        let request = LoginRequest::secure_digest(
            session.username(),
            &challenge.cnonce,
            SECURE_ENCRYPT_TYPE,
            &digest,
        );
        let response = self.login(Phase::SecurePhase3, session, &request).await?;

        if response.error_code != DeviceStatus::SUCCESS {
            return Err(TapoError::device(Phase::SecurePhase3, response.error_code));
        }
        let token = response
            .token()
            .ok_or_else(|| TapoError::malformed(Phase::SecurePhase3, "missing session token"))?
            .to_string();
        let start_seq = response.result.start_seq.unwrap_or_default();

        log::debug!(
            "Secure login phase 3 on {} complete ({:?}, start_seq={})",
            session.host(),
            validated.algorithm,
            start_seq
        );
        Ok(Established {
            token,
            secure: true,
            hashed_password: validated.hashed_password,
            cnonce: challenge.cnonce,
            nonce: challenge.nonce,
            keys: Some(validated.keys),
            start_seq,
            user_group: response.result.user_group,
        })
    }

    /// POST a login request to the unauthenticated endpoint
    async fn login(
        &self,
        phase: Phase,
        session: &Session,
        request: &LoginRequest,
    ) -> TapoResult<LoginResponse> {
        let body = serde_json::to_vec(request).map_err(|e| TapoError::serialization(phase, e))?;
        let request = ApiRequest::new(session.host(), Endpoint::Login, body);
        let response = self
            .transport
            .post(request)
            .await
            .map_err(|e| TapoError::transport(phase, e))?;
        serde_json::from_slice(&response).map_err(|e| TapoError::serialization(phase, e))
    }
}
