//! Behavioural switches for device sessions.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// What the hub does when a device name that already occupies a roster slot
/// registers again on a new connection.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DuplicatePolicy {
    /// Deny the newcomer and keep the existing session.
    #[default]
    Reject,
    /// Close the existing session and hand the slot to the newcomer.
    Evict,
}

/// How inbound bytes are cut into protocol messages.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Framing {
    /// Every read is a delivery; newline-separated pieces inside it are
    /// separate messages and an unterminated tail still counts as one.
    #[default]
    Chunk,
    /// Messages end at `\n`; partial lines are buffered until completed.
    Line,
}

/// Errors encountered while parsing a policy value from text.
pub type PolicyParseError = strum::ParseError;
