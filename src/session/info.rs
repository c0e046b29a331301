//! # Handshake response parsing.
//!
//! Expected response, one field per line:
//! ```text
//! Upgrade: <version>      (zero or one)
//! PSK: <hexstring>        (zero or one)
//! Homepage: <url>         (zero or more)
//! Server: <hexstring>     (zero or more)
//! SSHPort: <string>       (zero or one)
//! SSHUsername: <string>   (zero or one)
//! SSHPassword: <string>   (zero or one)
//! SSHHostkey: <string>    (zero or one)
//! ```
//!
//! ## Rules
//! - singular fields keep the **last** value seen
//! - repeatable fields accumulate in encounter order
//! - unrecognised lines are ignored
//! - prefixes are case-sensitive and include the `": "` separator

use thiserror::Error;

const UPGRADE: &str = "Upgrade: ";
const PSK: &str = "PSK: ";
const HOMEPAGE: &str = "Homepage: ";
const SERVER: &str = "Server: ";
const SSH_PORT: &str = "SSHPort: ";
const SSH_USERNAME: &str = "SSHUsername: ";
const SSH_PASSWORD: &str = "SSHPassword: ";
const SSH_HOST_KEY: &str = "SSHHostkey: ";

/// Validation failures of a handshake response.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No `PSK:` line was present.
    #[error("handshake response has no PSK")]
    MissingPsk,

    /// More than one `PSK:` line was present.
    #[error("handshake response has {count} PSK lines")]
    DuplicatePsk {
        /// Number of PSK lines seen.
        count: usize,
    },

    /// The `PSK:` line was blank.
    #[error("handshake response has a blank PSK")]
    BlankPsk,
}

/// Server the handshake was made against.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServerEntry {
    /// Host name or IP address.
    pub address: String,
    /// Port of the server's web (handshake) endpoint.
    pub web_server_port: u16,
    /// Secret presented to the web endpoint.
    pub web_server_secret: String,
}

/// Tunnel configuration returned by a handshake.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionInfo {
    server_entry: Option<ServerEntry>,
    upgrade_version: Option<String>,
    psk: Option<String>,
    ssh_port: Option<String>,
    ssh_username: Option<String>,
    ssh_password: Option<String>,
    ssh_host_key: Option<String>,
    homepages: Vec<String>,
    servers: Vec<String>,
}

impl SessionInfo {
    /// Parses a handshake response without validation.
    ///
    /// # Example
    /// ```
    /// use tunnelvisor::SessionInfo;
    ///
    /// let info = SessionInfo::parse("PSK: 00ff\nHomepage: a\nHomepage: b\nSSHPort: 22\n");
    /// assert_eq!(info.psk(), Some("00ff"));
    /// assert_eq!(info.homepages(), ["a", "b"]);
    /// assert_eq!(info.ssh_port(), Some("22"));
    /// ```
    pub fn parse(response: &str) -> Self {
        Self::scan(response).0
    }

    /// Parses a handshake response and requires exactly one non-blank PSK.
    pub fn parse_validated(response: &str) -> Result<Self, SessionError> {
        let (info, psk_lines) = Self::scan(response);
        match psk_lines {
            0 => Err(SessionError::MissingPsk),
            1 if info.psk().is_some_and(|psk| psk.trim().is_empty()) => {
                Err(SessionError::BlankPsk)
            }
            1 => Ok(info),
            count => Err(SessionError::DuplicatePsk { count }),
        }
    }

    /// Returns the record with the server entry attached.
    pub fn with_server_entry(mut self, entry: ServerEntry) -> Self {
        self.server_entry = Some(entry);
        self
    }

    fn scan(response: &str) -> (Self, usize) {
        let mut info = Self::default();
        let mut psk_lines = 0;

        for line in response.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);

            if let Some(v) = line.strip_prefix(UPGRADE) {
                info.upgrade_version = Some(v.to_string());
            } else if let Some(v) = line.strip_prefix(PSK) {
                psk_lines += 1;
                info.psk = Some(v.to_string());
            } else if let Some(v) = line.strip_prefix(SSH_PORT) {
                info.ssh_port = Some(v.to_string());
            } else if let Some(v) = line.strip_prefix(SSH_USERNAME) {
                info.ssh_username = Some(v.to_string());
            } else if let Some(v) = line.strip_prefix(SSH_PASSWORD) {
                info.ssh_password = Some(v.to_string());
            } else if let Some(v) = line.strip_prefix(SSH_HOST_KEY) {
                info.ssh_host_key = Some(v.to_string());
            } else if let Some(v) = line.strip_prefix(HOMEPAGE) {
                info.homepages.push(v.to_string());
            } else if let Some(v) = line.strip_prefix(SERVER) {
                info.servers.push(v.to_string());
            }
        }
        (info, psk_lines)
    }

    /// Server the handshake was made against, if attached.
    pub fn server_entry(&self) -> Option<&ServerEntry> {
        self.server_entry.as_ref()
    }

    /// Client version offered by the `Upgrade:` line.
    pub fn upgrade_version(&self) -> Option<&str> {
        self.upgrade_version.as_deref()
    }

    /// Pre-shared key, hex encoded.
    pub fn psk(&self) -> Option<&str> {
        self.psk.as_deref()
    }

    /// SSH port, as sent.
    pub fn ssh_port(&self) -> Option<&str> {
        self.ssh_port.as_deref()
    }

    /// SSH user name.
    pub fn ssh_username(&self) -> Option<&str> {
        self.ssh_username.as_deref()
    }

    /// SSH password.
    pub fn ssh_password(&self) -> Option<&str> {
        self.ssh_password.as_deref()
    }

    /// SSH host key, as sent.
    pub fn ssh_host_key(&self) -> Option<&str> {
        self.ssh_host_key.as_deref()
    }

    /// Home pages, in the order the server sent them.
    pub fn homepages(&self) -> &[String] {
        &self.homepages
    }

    /// Additional server entries, in the order the server sent them.
    pub fn servers(&self) -> &[String] {
        &self.servers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = "Upgrade: 42\n\
                            PSK: deadbeef\n\
                            Homepage: https://a.example\n\
                            Server: 0a0b\n\
                            Homepage: https://b.example\n\
                            SSHPort: 22\n\
                            SSHUsername: user\n\
                            SSHPassword: pass\n\
                            SSHHostkey: AAAAB3\n\
                            Server: 0c0d\n";

    #[test]
    fn test_parse_full_response() {
        let info = SessionInfo::parse_validated(RESPONSE).expect("valid");
        assert_eq!(info.upgrade_version(), Some("42"));
        assert_eq!(info.psk(), Some("deadbeef"));
        assert_eq!(info.ssh_port(), Some("22"));
        assert_eq!(info.ssh_username(), Some("user"));
        assert_eq!(info.ssh_password(), Some("pass"));
        assert_eq!(info.ssh_host_key(), Some("AAAAB3"));
        assert_eq!(info.homepages(), ["https://a.example", "https://b.example"]);
        assert_eq!(info.servers(), ["0a0b", "0c0d"]);
        assert_eq!(info.server_entry(), None);
    }

    #[test]
    fn test_singular_fields_keep_last_value() {
        let info = SessionInfo::parse("SSHPort: 22\nSSHPort: 2222\nUpgrade: 1\nUpgrade: 2");
        assert_eq!(info.ssh_port(), Some("2222"));
        assert_eq!(info.upgrade_version(), Some("2"));
    }

    #[test]
    fn test_unknown_and_malformed_lines_are_ignored() {
        let info = SessionInfo::parse("Bogus: 1\nPSK:nospace\n psk: lower\n\nPSK: ok\r\n");
        assert_eq!(info.psk(), Some("ok"));
        assert!(info.homepages().is_empty());
    }

    #[test]
    fn test_empty_response_is_empty_record() {
        assert_eq!(SessionInfo::parse(""), SessionInfo::default());
    }

    #[test]
    fn test_validation_requires_exactly_one_non_blank_psk() {
        assert_eq!(
            SessionInfo::parse_validated("Homepage: x\n"),
            Err(SessionError::MissingPsk)
        );
        assert_eq!(
            SessionInfo::parse_validated("PSK: a\nPSK: b\n"),
            Err(SessionError::DuplicatePsk { count: 2 })
        );
        assert_eq!(
            SessionInfo::parse_validated("PSK:  \n"),
            Err(SessionError::BlankPsk)
        );
    }

    #[test]
    fn test_with_server_entry() {
        let entry = ServerEntry {
            address: "192.0.2.1".into(),
            web_server_port: 8080,
            web_server_secret: "s3cret".into(),
        };
        let info = SessionInfo::parse(RESPONSE).with_server_entry(entry.clone());
        assert_eq!(info.server_entry(), Some(&entry));
    }
}
