// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Class labels for detection outputs

use regex::Regex;
use std::collections::BTreeMap;

/// Metadata key Ultralytics exports store class names under
pub const NAMES_METADATA_KEY: &str = "names";

/// Mapping from class index to label
///
/// Unknown indices fall back to `class_{id}` so a model without metadata still
/// produces stable labels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassNames {
    names: BTreeMap<usize, String>,
}

impl ClassNames {
    pub fn new(names: BTreeMap<usize, String>) -> Self {
        Self { names }
    }

    /// Parse the Ultralytics `names` metadata string, e.g. `{0: 'face', 1: 'person'}`
    ///
    /// Returns `None` when no entry can be parsed.
    pub fn from_metadata(raw: &str) -> Option<Self> {
        let pattern = Regex::new(r#"(\d+)\s*:\s*(?:'([^']*)'|"([^"]*)")"#).ok()?;

        let names: BTreeMap<usize, String> = pattern
            .captures_iter(raw)
            .filter_map(|caps| {
                let id = caps.get(1)?.as_str().parse::<usize>().ok()?;
                let name = caps.get(2).or_else(|| caps.get(3))?.as_str().to_string();
                Some((id, name))
            })
            .collect();

        if names.is_empty() {
            None
        } else {
            Some(Self { names })
        }
    }

    /// Label for a class index
    pub fn label(&self, class_id: usize) -> String {
        self.names
            .get(&class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", class_id))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
