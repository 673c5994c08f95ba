// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for dependent-resource construction.
//!
//! Builders distinguish "the optional source material for this secret does
//! not exist" from genuine failures. The reconcilers skip the former and
//! abort on the latter, so the distinction must survive error propagation.

use thiserror::Error;

/// Errors raised while building a dependent resource.
#[derive(Error, Debug)]
pub enum BuildError {
    /// The optional upstream source material for a secret is absent.
    ///
    /// Raised when the operator configuration does not name a source path,
    /// or the named file does not exist. The reconciler skips the secret;
    /// this is not fatal to the workload's reconciliation.
    #[error("source material for secret '{name}' does not exist")]
    SourceSecretMissing {
        /// The dependent secret whose source is absent
        name: String,
    },

    /// A configured source file exists but could not be read.
    ///
    /// Unlike [`BuildError::SourceSecretMissing`] this is fatal: a file the
    /// operator was told to mount is present but broken, which indicates
    /// infrastructure damage rather than an optional feature being off.
    #[error("failed to read source material from '{path}'")]
    SourceReadFailed {
        /// The path that failed to read
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A configuration payload failed to serialize.
    #[error("failed to serialize {what} payload")]
    Serialization {
        /// Human-readable name of the payload being serialized
        what: String,
        /// Underlying serializer error
        #[source]
        source: serde_yaml::Error,
    },

    /// The workload is missing a field the builder requires (e.g., a UID).
    #[error("workload {namespace}/{name} is missing required field '{field}'")]
    IncompleteWorkload {
        /// Workload namespace
        namespace: String,
        /// Workload name
        name: String,
        /// The absent field
        field: String,
    },
}

impl BuildError {
    /// Returns true when the error only signals absent optional source
    /// material and the corresponding secret should be skipped.
    #[must_use]
    pub fn is_missing_source(&self) -> bool {
        matches!(self, Self::SourceSecretMissing { .. })
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
