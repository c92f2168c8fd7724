//! resource::models
//!
//! Request and response envelopes.
//!
//! Requests are read from stdin, responses written to stdout, both JSON.
//! Unknown fields are ignored so newer pipelines keep working; required
//! fields and value formats are checked by [`Source::validate`] before any
//! store access.

use serde::{Deserialize, Serialize};

use crate::core::config::schema::parse_duration;
use crate::core::types::{Oid, PoolName};
use crate::pool::{ClaimResult, RetryPolicy};

use super::ResourceError;

/// Where the pool lives and how to treat it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Repository URL or path
    pub uri: String,
    pub branch: String,
    /// Required by `check` and `out`; `in` infers it from the version
    #[serde(default)]
    pub pool: Option<PoolName>,
    #[serde(default)]
    pub private_key: Option<String>,
    /// Duration string such as `"10s"`
    #[serde(default)]
    pub retry_delay: Option<String>,
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub wait_for_lock: Option<bool>,
}

impl Source {
    /// Check required fields and value formats.
    pub fn validate(&self) -> Result<(), ResourceError> {
        if self.uri.trim().is_empty() {
            return Err(ResourceError::MissingField("source.uri"));
        }
        if self.branch.trim().is_empty() {
            return Err(ResourceError::MissingField("source.branch"));
        }
        if self.max_attempts == Some(0) {
            return Err(ResourceError::InvalidField {
                field: "source.max_attempts",
                message: "must be at least 1".to_string(),
            });
        }
        if let Some(delay) = &self.retry_delay {
            parse_duration(delay).map_err(|e| ResourceError::InvalidField {
                field: "source.retry_delay",
                message: e.to_string(),
            })?;
        }
        Ok(())
    }

    /// The pool, for requests that cannot infer it.
    pub fn require_pool(&self) -> Result<&PoolName, ResourceError> {
        self.pool
            .as_ref()
            .ok_or(ResourceError::MissingField("source.pool"))
    }

    /// Layer this source's retry settings over `base`.
    pub fn retry_policy(&self, base: RetryPolicy) -> Result<RetryPolicy, ResourceError> {
        let mut policy = base;
        if let Some(attempts) = self.max_attempts {
            policy.max_attempts = attempts;
        }
        if let Some(delay) = &self.retry_delay {
            policy.retry_delay = parse_duration(delay).map_err(|e| ResourceError::InvalidField {
                field: "source.retry_delay",
                message: e.to_string(),
            })?;
        }
        if let Some(wait) = self.wait_for_lock {
            policy.wait_for_lock = wait;
        }
        Ok(policy)
    }
}

/// A version as pipelines see it: `{"ref": "<id>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    #[serde(rename = "ref")]
    pub reference: Oid,
}

impl From<Oid> for Version {
    fn from(reference: Oid) -> Self {
        Self { reference }
    }
}

/// One `{"name": ..., "value": ...}` metadata entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataPair {
    pub name: String,
    pub value: String,
}

impl MetadataPair {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// `check` request.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckRequest {
    pub source: Source,
    #[serde(default)]
    pub version: Option<Version>,
}

/// `in` request.
#[derive(Debug, Clone, Deserialize)]
pub struct InRequest {
    pub source: Source,
    pub version: Version,
}

/// `out` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OutParams {
    #[serde(default)]
    pub acquire: Option<bool>,
    /// Directory (relative to the sources dir) holding the lock's `name` file
    #[serde(default)]
    pub release: Option<String>,
}

/// What an `out` request asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutAction {
    Acquire,
    Release { from: String },
}

impl OutParams {
    /// Decide the action. Empty params acquire.
    pub fn action(&self) -> Result<OutAction, ResourceError> {
        match (self.acquire, &self.release) {
            (Some(true), Some(_)) => Err(ResourceError::InvalidField {
                field: "params",
                message: "specify either acquire or release, not both".to_string(),
            }),
            (_, Some(dir)) if dir.trim().is_empty() => Err(ResourceError::InvalidField {
                field: "params.release",
                message: "must name a directory".to_string(),
            }),
            (_, Some(dir)) => Ok(OutAction::Release { from: dir.clone() }),
            (Some(false), None) => Err(ResourceError::InvalidField {
                field: "params",
                message: "nothing to do: acquire is false and no release given".to_string(),
            }),
            (_, None) => Ok(OutAction::Acquire),
        }
    }
}

/// `out` request.
#[derive(Debug, Clone, Deserialize)]
pub struct OutRequest {
    pub source: Source,
    #[serde(default)]
    pub params: OutParams,
}

/// Response of `in` and `out`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: Version,
    pub metadata: Vec<MetadataPair>,
}

impl VersionResponse {
    /// Response describing the lock moved by `result.version`.
    pub fn for_lock(result: &ClaimResult) -> Self {
        Self {
            version: Version::from(result.version.clone()),
            metadata: vec![
                MetadataPair::new("lock_name", result.lock_name.as_str()),
                MetadataPair::new("pool_name", result.pool_name.as_str()),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::LockName;
    use std::time::Duration;

    const SHA: &str = "0123456789abcdef0123456789abcdef01234567";

    fn source(json: &str) -> Source {
        serde_json::from_str(json).unwrap()
    }

    mod source {
        use super::*;

        #[test]
        fn minimal_source_parses() {
            let src = source(r#"{"uri": "/tmp/repo", "branch": "master", "pool": "lock-pool"}"#);
            src.validate().unwrap();
            assert_eq!(src.require_pool().unwrap().as_str(), "lock-pool");
            assert_eq!(src.private_key, None);
        }

        #[test]
        fn missing_pool_is_reported_on_demand() {
            let src = source(r#"{"uri": "/tmp/repo", "branch": "master"}"#);
            src.validate().unwrap();
            assert_eq!(
                src.require_pool().unwrap_err(),
                ResourceError::MissingField("source.pool")
            );
        }

        #[test]
        fn invalid_pool_name_fails_to_parse() {
            let result: Result<Source, _> =
                serde_json::from_str(r#"{"uri": "x", "branch": "b", "pool": "../etc"}"#);
            assert!(result.is_err());
        }

        #[test]
        fn empty_uri_is_invalid() {
            let src = source(r#"{"uri": " ", "branch": "master"}"#);
            assert_eq!(
                src.validate().unwrap_err(),
                ResourceError::MissingField("source.uri")
            );
        }

        #[test]
        fn retry_fields_override_base_policy() {
            let src = source(
                r#"{"uri": "u", "branch": "b", "retry_delay": "250ms",
                    "max_attempts": 3, "wait_for_lock": true}"#,
            );
            src.validate().unwrap();

            let policy = src.retry_policy(RetryPolicy::default()).unwrap();
            assert_eq!(policy.max_attempts, 3);
            assert_eq!(policy.retry_delay, Duration::from_millis(250));
            assert!(policy.wait_for_lock);
        }

        #[test]
        fn bad_retry_delay_is_rejected() {
            let src = source(r#"{"uri": "u", "branch": "b", "retry_delay": "soon"}"#);
            assert!(matches!(
                src.validate(),
                Err(ResourceError::InvalidField {
                    field: "source.retry_delay",
                    ..
                })
            ));
        }

        #[test]
        fn zero_attempts_is_rejected() {
            let src = source(r#"{"uri": "u", "branch": "b", "max_attempts": 0}"#);
            assert!(src.validate().is_err());
        }
    }

    mod params {
        use super::*;

        fn params(json: &str) -> OutParams {
            serde_json::from_str(json).unwrap()
        }

        #[test]
        fn empty_params_acquire() {
            assert_eq!(params("{}").action().unwrap(), OutAction::Acquire);
            assert_eq!(
                params(r#"{"acquire": true}"#).action().unwrap(),
                OutAction::Acquire
            );
        }

        #[test]
        fn release_names_directory() {
            assert_eq!(
                params(r#"{"release": "my-lock"}"#).action().unwrap(),
                OutAction::Release {
                    from: "my-lock".to_string()
                }
            );
        }

        #[test]
        fn conflicting_params_are_rejected() {
            assert!(params(r#"{"acquire": true, "release": "x"}"#).action().is_err());
            assert!(params(r#"{"acquire": false}"#).action().is_err());
            assert!(params(r#"{"release": ""}"#).action().is_err());
        }
    }

    mod envelopes {
        use super::*;

        #[test]
        fn check_request_without_version() {
            let req: CheckRequest = serde_json::from_str(
                r#"{"source": {"uri": "u", "branch": "b", "pool": "p"}, "version": null}"#,
            )
            .unwrap();
            assert!(req.version.is_none());
        }

        #[test]
        fn in_request_reads_ref() {
            let req: InRequest = serde_json::from_str(&format!(
                r#"{{"source": {{"uri": "u", "branch": "b"}}, "version": {{"ref": "{SHA}\n"}}}}"#
            ))
            .unwrap();
            assert_eq!(req.version.reference.as_str(), SHA);
        }

        #[test]
        fn out_request_defaults_params() {
            let req: OutRequest =
                serde_json::from_str(r#"{"source": {"uri": "u", "branch": "b", "pool": "p"}}"#)
                    .unwrap();
            assert_eq!(req.params, OutParams::default());
        }

        #[test]
        fn version_response_shape() {
            let result = ClaimResult {
                lock_name: LockName::new("some-lock").unwrap(),
                pool_name: PoolName::new("lock-pool").unwrap(),
                content: b"{}".to_vec(),
                version: Oid::new(SHA).unwrap(),
            };

            let json = serde_json::to_value(VersionResponse::for_lock(&result)).unwrap();
            assert_eq!(
                json,
                serde_json::json!({
                    "version": {"ref": SHA},
                    "metadata": [
                        {"name": "lock_name", "value": "some-lock"},
                        {"name": "pool_name", "value": "lock-pool"}
                    ]
                })
            );
        }
    }
}
