use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Correlation key attached to every awaited execution request.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::Deref,
)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(value: impl AsRef<str>) -> Result<Self> {
        Ok(Self(
            Uuid::parse_str(value.as_ref()).map_err(Error::InvalidRequestId)?,
        ))
    }
}
