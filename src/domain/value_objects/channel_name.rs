use serde::{Deserialize, Serialize};

use crate::domain::errors::CodecError;

/// Name of an independently indexed side stream of a data unit
/// (e.g. "data", "Context").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChannelName(String);

impl ChannelName {
    const MAX_LENGTH: usize = 64;

    pub const DATA: &'static str = "data";
    pub const CONTEXT: &'static str = "Context";
    pub const MANIFEST: &'static str = "Manifest";
    pub const SEGMENT_INDEX: &'static str = "Segment Index";
    pub const BOUNDARY_INDEX: &'static str = "Boundary Index";

    /// Built-in channels and the file extensions of their primary streams.
    const BUILT_IN: [(&'static str, &'static str); 5] = [
        (Self::DATA, "dat"),
        (Self::CONTEXT, "ctx"),
        (Self::MANIFEST, "mf"),
        (Self::SEGMENT_INDEX, "seg"),
        (Self::BOUNDARY_INDEX, "bdy"),
    ];

    /// Accepts the built-in names as they are. Any other name is its own
    /// file extension, so it must be lower-case without spaces and must not
    /// be the extension of a built-in channel.
    pub fn new(value: impl Into<String>) -> Result<Self, CodecError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(CodecError::InvalidChannelName(
                "Channel name cannot be empty".to_string(),
            ));
        }

        if value.len() > Self::MAX_LENGTH {
            return Err(CodecError::InvalidChannelName(format!(
                "Channel name too long: {} > {}",
                value.len(),
                Self::MAX_LENGTH
            )));
        }

        if Self::BUILT_IN.iter().any(|(name, _)| *name == value) {
            return Ok(Self(value));
        }

        // Path separators and dots never reach a file name
        if !value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
        {
            return Err(CodecError::InvalidChannelName(format!(
                "Channel name must be lower-case alphanumeric with underscores/hyphens: {}",
                value
            )));
        }

        if let Some((name, _)) = Self::BUILT_IN.iter().find(|(_, ext)| *ext == value) {
            return Err(CodecError::InvalidChannelName(format!(
                "Channel name '{}' would share files with channel '{}'",
                value, name
            )));
        }

        Ok(Self(value))
    }

    /// The primary channel every data unit has.
    pub fn data() -> Self {
        Self(Self::DATA.to_string())
    }

    pub fn context() -> Self {
        Self(Self::CONTEXT.to_string())
    }

    pub fn manifest() -> Self {
        Self(Self::MANIFEST.to_string())
    }

    /// Channels managed by the codec itself and never handed out per part.
    pub fn is_reserved(&self) -> bool {
        matches!(
            self.0.as_str(),
            Self::MANIFEST | Self::SEGMENT_INDEX | Self::BOUNDARY_INDEX
        )
    }

    pub fn is_primary(&self) -> bool {
        self.0 == Self::DATA
    }

    /// File extension used for this channel's primary stream.
    /// Distinct names always have distinct extensions.
    pub fn extension(&self) -> &str {
        Self::BUILT_IN
            .iter()
            .find(|(name, _)| *name == self.0)
            .map(|(_, ext)| *ext)
            .unwrap_or(self.0.as_str())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ChannelName {
    fn default() -> Self {
        Self::data()
    }
}

impl std::fmt::Display for ChannelName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ChannelName {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ChannelName {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ChannelName> for String {
    fn from(name: ChannelName) -> Self {
        name.0
    }
}
