// SPDX-License-Identifier: MIT

//! ID generation abstractions and the [`MachineId`] key type.

/// Maximum byte length for an inline ID.
///
/// `MachineId::parse` accepts caller-supplied keys of any length up to this
/// cap; longer keys are rejected by [`IdBuf::new`] in debug builds.
pub const ID_MAX_LEN: usize = 64;

/// Fixed-size inline ID buffer. Always ≤ [`ID_MAX_LEN`] ASCII bytes, `Clone`.
#[derive(Clone, PartialEq, Eq)]
pub struct IdBuf {
    len: u8,
    buf: [u8; ID_MAX_LEN],
}

impl std::hash::Hash for IdBuf {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        // Hash only the active bytes so it matches str::hash, which is
        // required for Borrow<str> HashMap lookups.
        self.as_str().hash(state);
    }
}

impl IdBuf {
    pub fn new(s: &str) -> Self {
        debug_assert!(
            s.len() <= ID_MAX_LEN,
            "ID exceeds {} bytes ({} bytes): {:?}",
            ID_MAX_LEN,
            s.len(),
            s,
        );
        let len = s.len().min(ID_MAX_LEN);
        let mut buf = [0u8; ID_MAX_LEN];
        buf[..len].copy_from_slice(&s.as_bytes()[..len]);
        Self { len: len as u8, buf }
    }

    pub fn as_str(&self) -> &str {
        // Invariant: only constructed from &str, always valid UTF-8.
        match std::str::from_utf8(&self.buf[..self.len as usize]) {
            Ok(s) => s,
            Err(_) => unreachable!("IdBuf constructed from non-UTF-8"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl std::borrow::Borrow<str> for IdBuf {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Debug for IdBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl std::fmt::Display for IdBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl serde::Serialize for IdBuf {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for IdBuf {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <&str>::deserialize(deserializer)?;
        if s.len() > ID_MAX_LEN {
            return Err(serde::de::Error::custom(format!(
                "ID exceeds {} bytes: {:?}",
                ID_MAX_LEN, s
            )));
        }
        Ok(IdBuf::new(s))
    }
}

/// Error returned by [`MachineId::parse`] for an invalid key.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MachineIdError {
    #[error("machine id must not be empty")]
    Empty,
    #[error("machine id exceeds {ID_MAX_LEN} bytes")]
    TooLong,
}

/// The stable external identifier a caller uses to address a managed entity.
///
/// `MachineId` is never randomly generated: it must be a caller-supplied,
/// non-empty, immutable string unique across the registry (a phone number,
/// an SMS correlation id, …), so construction always goes through
/// [`MachineId::parse`]/[`MachineId::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct MachineId(IdBuf);

impl MachineId {
    /// Construct a `MachineId`, rejecting empty or oversized keys.
    pub fn parse(id: impl AsRef<str>) -> Result<Self, MachineIdError> {
        let s = id.as_ref();
        if s.is_empty() {
            return Err(MachineIdError::Empty);
        }
        if s.len() > ID_MAX_LEN {
            return Err(MachineIdError::TooLong);
        }
        Ok(Self(IdBuf::new(s)))
    }

    /// Construct a `MachineId` from a key already known to be valid.
    ///
    /// Panics (via debug_assert in [`IdBuf::new`]) only in debug builds if
    /// the key is oversized; prefer [`MachineId::parse`] for untrusted input.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(IdBuf::new(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for MachineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MachineId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for MachineId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for MachineId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl std::borrow::Borrow<str> for MachineId {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;