//! Test doubles for the provider seams.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

use super::{ProvideCredentials, ProvideSession};
use crate::{
    aws::{
        Credentials, SessionCredentials,
        sts::{SessionTokenClient, SessionTokenRequest},
    },
    mfa::MfaCodeSource,
};

pub fn session_credentials(
    access_key_id: &str,
    secret_access_key: &str,
    session_token: &str,
    expiration: DateTime<Utc>,
) -> SessionCredentials {
    SessionCredentials {
        access_key_id: access_key_id.to_string(),
        secret_access_key: secret_access_key.to_string(),
        session_token: session_token.to_string(),
        expiration,
    }
}

pub struct FakeCredentialsSource {
    err: Option<String>,
    calls: AtomicUsize,
}

impl FakeCredentialsSource {
    pub fn ok() -> Self {
        Self {
            err: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn err(message: &str) -> Self {
        Self {
            err: Some(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProvideCredentials for FakeCredentialsSource {
    async fn provide_credentials(&self) -> Result<Credentials> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.err {
            Some(message) => Err(anyhow!(message.clone())),
            None => Ok(Credentials::new("BASE_KEY", "BASE_SECRET")),
        }
    }
}

pub struct FakeMfaCodeSource {
    code: Result<String, String>,
    calls: AtomicUsize,
}

impl FakeMfaCodeSource {
    pub fn ok(code: &str) -> Self {
        Self {
            code: Ok(code.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn err(message: &str) -> Self {
        Self {
            code: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MfaCodeSource for FakeMfaCodeSource {
    async fn mfa_code(&self) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.code.clone().map_err(|message| anyhow!(message))
    }
}

pub struct FakeSessionTokenClient {
    output: Result<Option<SessionCredentials>, String>,
    last: Mutex<Option<(Credentials, SessionTokenRequest)>>,
}

impl FakeSessionTokenClient {
    pub fn ok(creds: SessionCredentials) -> Self {
        Self {
            output: Ok(Some(creds)),
            last: Mutex::new(None),
        }
    }

    pub fn empty() -> Self {
        Self {
            output: Ok(None),
            last: Mutex::new(None),
        }
    }

    pub fn err(message: &str) -> Self {
        Self {
            output: Err(message.to_string()),
            last: Mutex::new(None),
        }
    }

    pub fn last_request(&self) -> Option<SessionTokenRequest> {
        self.last
            .lock()
            .unwrap()
            .as_ref()
            .map(|(_, request)| request.clone())
    }

    pub fn last_base(&self) -> Option<Credentials> {
        self.last.lock().unwrap().as_ref().map(|(base, _)| base.clone())
    }
}

#[async_trait]
impl SessionTokenClient for FakeSessionTokenClient {
    async fn get_session_token(
        &self,
        base: &Credentials,
        request: &SessionTokenRequest,
    ) -> Result<Option<SessionCredentials>> {
        *self.last.lock().unwrap() = Some((base.clone(), request.clone()));
        self.output.clone().map_err(|message| anyhow!(message))
    }
}

pub struct FakeSessionProvider {
    output: Result<SessionCredentials, String>,
    calls: AtomicUsize,
}

impl FakeSessionProvider {
    pub fn ok(creds: SessionCredentials) -> Self {
        Self {
            output: Ok(creds),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn err(message: &str) -> Self {
        Self {
            output: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProvideSession for FakeSessionProvider {
    async fn provide_session(&self) -> Result<SessionCredentials> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.output.clone().map_err(|message| anyhow!(message))
    }
}

#[async_trait]
impl ProvideCredentials for FakeSessionProvider {
    async fn provide_credentials(&self) -> Result<Credentials> {
        self.provide_session().await.map(Credentials::from)
    }
}
