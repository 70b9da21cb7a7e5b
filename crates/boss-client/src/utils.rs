/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! YAML helpers for manifest and credential payloads.

use crate::error::{BrokerError, Result};
use serde::de::Deserialize;

/// Parses every document of a (possibly multi-document) YAML string.
pub fn parse_documents(content: &str) -> std::result::Result<Vec<serde_yaml::Value>, serde_yaml::Error> {
    let mut docs = vec![];
    for d in serde_yaml::Deserializer::from_str(content) {
        docs.push(serde_yaml::Value::deserialize(d)?);
    }
    Ok(docs)
}

/// Checks that `content` is well-formed YAML, labelling a failure with `context`.
pub fn validate_yaml(content: &str, context: impl Into<String>) -> Result<()> {
    parse_documents(content)
        .map(|_| ())
        .map_err(|source| BrokerError::Validation {
            context: context.into(),
            source,
        })
}
