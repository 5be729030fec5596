// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Stream selection.
//!
//! A [`StreamFilter`] decides which dataset streams are converted. It is
//! applied to stream keys (e.g. `observation.images.top`), never to topics.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::core::{ConvertError, Result};

/// Filter for selecting streams during conversion.
#[derive(Clone, Default)]
pub enum StreamFilter {
    /// Convert all streams
    #[default]
    All,
    /// Convert only the listed streams
    Include(BTreeSet<String>),
    /// Convert everything except the listed streams
    Exclude(BTreeSet<String>),
    /// Convert streams matching a regex
    RegexInclude(Arc<regex::Regex>),
    /// Skip streams matching a regex
    RegexExclude(Arc<regex::Regex>),
    /// Custom predicate
    Custom(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl fmt::Debug for StreamFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.debug_tuple("All").finish(),
            Self::Include(v) => f.debug_tuple("Include").field(v).finish(),
            Self::Exclude(v) => f.debug_tuple("Exclude").field(v).finish(),
            Self::RegexInclude(re) => f.debug_tuple("RegexInclude").field(&re.as_str()).finish(),
            Self::RegexExclude(re) => f.debug_tuple("RegexExclude").field(&re.as_str()).finish(),
            Self::Custom(_) => f.debug_tuple("Custom").field(&"<fn>").finish(),
        }
    }
}

impl StreamFilter {
    /// Check if a stream should be converted.
    pub fn should_include(&self, stream_key: &str) -> bool {
        match self {
            StreamFilter::All => true,
            StreamFilter::Include(keys) => keys.contains(stream_key),
            StreamFilter::Exclude(keys) => !keys.contains(stream_key),
            StreamFilter::RegexInclude(re) => re.is_match(stream_key),
            StreamFilter::RegexExclude(re) => !re.is_match(stream_key),
            StreamFilter::Custom(f) => f(stream_key),
        }
    }

    /// Create an include filter from stream keys.
    pub fn include<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Include(keys.into_iter().map(Into::into).collect())
    }

    /// Create an exclude filter from stream keys.
    pub fn exclude<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Exclude(keys.into_iter().map(Into::into).collect())
    }

    /// Create a regex include filter.
    pub fn regex_include(pattern: &str) -> Result<Self> {
        compile(pattern).map(|re| Self::RegexInclude(Arc::new(re)))
    }

    /// Create a regex exclude filter.
    pub fn regex_exclude(pattern: &str) -> Result<Self> {
        compile(pattern).map(|re| Self::RegexExclude(Arc::new(re)))
    }

    /// Create a custom filter from a function.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Build a filter from configured include and exclude lists.
    ///
    /// An empty include list means "everything". Exclusions win over
    /// inclusions.
    pub fn from_lists(include: &[String], exclude: &[String]) -> Self {
        match (include.is_empty(), exclude.is_empty()) {
            (true, true) => Self::All,
            (false, true) => Self::include(include.iter().cloned()),
            (true, false) => Self::exclude(exclude.iter().cloned()),
            (false, false) => {
                let include: BTreeSet<String> = include.iter().cloned().collect();
                let exclude: BTreeSet<String> = exclude.iter().cloned().collect();
                Self::custom(move |key| include.contains(key) && !exclude.contains(key))
            }
        }
    }

    /// Whether this filter lets everything through.
    pub fn is_all(&self) -> bool {
        matches!(self, StreamFilter::All)
    }
}

fn compile(pattern: &str) -> Result<regex::Regex> {
    regex::Regex::new(pattern)
        .map_err(|e| ConvertError::parse("stream filter", format!("{pattern}: {e}")))
}
