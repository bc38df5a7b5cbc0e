//! Delivery to an [ntfy](https://ntfy.sh) topic over plain HTTP POST.

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use derive_getters::Getters;
use reqwest::blocking::Client;

use super::{Delivered, DeliveryError, Notifier};
use crate::log::*;

pub const URL_VAR: &str = "NTFY_URL";
pub const USER_VAR: &str = "NTFY_USER";
pub const PASS_VAR: &str = "NTFY_PASS";

pub const DEFAULT_URL: &str = "https://ntfy.example.com/ansible";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub const TITLE: &str = "Ansible Playbook Recap";
pub const PRIORITY: &str = "5";
pub const TAGS: &str = "ansible,recap";

/// Where to send the recap and, optionally, who to send it as.
#[derive(Getters, Clone, PartialEq, Eq)]
pub struct NtfyConfig {
    url: String,
    username: Option<String>,
    password: Option<String>,
}

impl NtfyConfig {
    pub fn new<S: Into<String>>(url: S) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
        }
    }

    pub fn with_credentials<S: Into<String>>(mut self, username: S, password: S) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Read `NTFY_URL`, `NTFY_USER` and `NTFY_PASS` from the environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key/value lookup. Empty values count as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.is_empty());
        Self {
            url: read(URL_VAR).unwrap_or_else(|| DEFAULT_URL.to_string()),
            username: read(USER_VAR),
            password: read(PASS_VAR),
        }
    }

    /// Basic auth credentials, only when both halves are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Some((username, password))
            }
            _ => None,
        }
    }
}

impl fmt::Debug for NtfyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NtfyConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Getters, Debug, Clone)]
pub struct NtfyNotifier {
    config: NtfyConfig,
    timeout: Duration,
    #[getter(skip)]
    client: Client,
}

impl NtfyNotifier {
    pub fn new(config: NtfyConfig) -> Result<Self> {
        Self::with_timeout(config, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(config: NtfyConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed building ntfy http client")?;
        Ok(Self {
            config,
            timeout,
            client,
        })
    }
}

impl Notifier for NtfyNotifier {
    #[tracing::instrument(skip(self, message), fields(url = %self.config.url))]
    fn notify(&self, message: &str) -> Result<Delivered, DeliveryError> {
        let mut request = self
            .client
            .post(self.config.url.as_str())
            .header("Title", TITLE)
            .header("Priority", PRIORITY)
            .header("Tags", TAGS)
            .body(message.as_bytes().to_vec());
        match self.config.credentials() {
            Some((username, password)) => {
                debug!("ntfy: using basic auth as {}", username);
                request = request.basic_auth(username, Some(password));
            }
            None => debug!("ntfy: sending without credentials"),
        }

        let response = request.send()?;
        let status = response.status();
        if status.is_success() {
            Ok(Delivered {
                status: status.as_u16(),
            })
        } else {
            let body = response
                .text()
                .unwrap_or_else(|err| format!("<unreadable body: {}>", err));
            Err(DeliveryError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}
