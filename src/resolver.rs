//! Serial device discovery.
//!
//! USB-serial devices come back under a new path or number after a physical
//! reset, so a fixed path cannot be trusted for long. The resolver tries the
//! preferred path first and then falls back to scanning the host for devices
//! whose names match the platform's USB-serial conventions.

use regex::RegexSet;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::config::SerialConfig;
use crate::port::{PortConfiguration, PortError, PortProvider};

/// Outcome of one resolution pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A device that opened successfully as a probe.
    Found(String),
    /// Nothing usable; carries the scanned candidates for diagnostics.
    NotFound { candidates: Vec<String> },
}

impl Resolution {
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Found(path) => Some(path),
            Self::NotFound { .. } => None,
        }
    }
}

/// Finds a usable serial device path.
pub struct PortResolver {
    provider: Arc<dyn PortProvider>,
    preferred: String,
    patterns: RegexSet,
    probe: PortConfiguration,
}

impl std::fmt::Debug for PortResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortResolver")
            .field("preferred", &self.preferred)
            .field("patterns", &self.patterns.patterns())
            .field("probe", &self.probe)
            .finish()
    }
}

impl PortResolver {
    /// Build a resolver. Fails with `PortError::Config` if a pattern does not compile.
    pub fn new<I, S>(
        provider: Arc<dyn PortProvider>,
        preferred: impl Into<String>,
        patterns: I,
        probe: PortConfiguration,
    ) -> Result<Self, PortError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = RegexSet::new(patterns)
            .map_err(|e| PortError::config(format!("invalid candidate pattern: {e}")))?;
        Ok(Self {
            provider,
            preferred: preferred.into(),
            patterns,
            probe,
        })
    }

    pub fn from_config(
        provider: Arc<dyn PortProvider>,
        config: &SerialConfig,
    ) -> Result<Self, PortError> {
        Self::new(
            provider,
            config.preferred_port.clone(),
            &config.candidate_patterns,
            PortConfiguration::new(config.baud_rate, config.probe_timeout()),
        )
    }

    pub fn preferred(&self) -> &str {
        &self.preferred
    }

    /// First usable device path, or `None`.
    pub fn resolve(&self) -> Option<String> {
        self.resolve_detailed().path().map(str::to_string)
    }

    /// Like `resolve`, but reports which candidates were scanned on failure.
    ///
    /// A configuration error on the preferred path is returned as-is so the
    /// caller can stop retrying. During the scan any probe error only skips
    /// that candidate.
    pub fn try_resolve(&self) -> Result<Resolution, PortError> {
        match self.probe(&self.preferred) {
            Ok(()) => return Ok(Resolution::Found(self.preferred.clone())),
            Err(e) if !e.is_recoverable() => return Err(e),
            Err(e) => trace!(path = %self.preferred, error = %e, "preferred port unavailable"),
        }

        let candidates = self.candidates()?;
        for path in &candidates {
            match self.probe(path) {
                Ok(()) => {
                    debug!(path = %path, "found serial device by scan");
                    return Ok(Resolution::Found(path.clone()));
                }
                Err(e) if !e.is_recoverable() => {
                    debug!(path = %path, error = %e, "candidate rejected configuration")
                }
                Err(e) => trace!(path = %path, error = %e, "candidate probe failed"),
            }
        }
        Ok(Resolution::NotFound { candidates })
    }

    fn resolve_detailed(&self) -> Resolution {
        self.try_resolve().unwrap_or(Resolution::NotFound {
            candidates: Vec::new(),
        })
    }

    /// Attached devices matching the naming patterns, preferred path excluded.
    pub fn candidates(&self) -> Result<Vec<String>, PortError> {
        let ports = match self.provider.available_ports() {
            Ok(ports) => ports,
            Err(e) if e.is_recoverable() => {
                trace!(error = %e, "device enumeration failed");
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        Ok(ports
            .into_iter()
            .filter(|p| p != &self.preferred && self.patterns.is_match(p))
            .collect())
    }

    /// Open and immediately drop a handle.
    fn probe(&self, path: &str) -> Result<(), PortError> {
        self.provider.open(path, &self.probe).map(drop)
    }
}
