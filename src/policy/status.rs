//! Status Code Filter Module

use serde::Deserialize;

// == Status Code Filter ==
/// Optional include/exclude lists deciding which status codes may be cached.
///
/// When both lists are set the include list decides and the exclude list is
/// ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StatusCodeFilter {
    #[serde(default)]
    pub include: Option<Vec<u16>>,
    #[serde(default)]
    pub exclude: Option<Vec<u16>>,
}

impl StatusCodeFilter {
    pub fn include(codes: impl Into<Vec<u16>>) -> Self {
        Self {
            include: Some(codes.into()),
            exclude: None,
        }
    }

    pub fn exclude(codes: impl Into<Vec<u16>>) -> Self {
        Self {
            include: None,
            exclude: Some(codes.into()),
        }
    }

    /// Returns whether a response with `status` may be captured.
    pub fn allows(&self, status: u16) -> bool {
        if let Some(include) = &self.include {
            return include.contains(&status);
        }
        if let Some(exclude) = &self.exclude {
            return !exclude.contains(&status);
        }
        true
    }
}
