//! Opaque identifier assigned to every stored image.
//!
//! Layout follows the 12-byte document-store convention so identifiers sort
//! roughly by creation time and render as 24 hex characters:
//!
//! | bytes  | content                                  |
//! |--------|------------------------------------------|
//! | 0..4   | Unix seconds, big-endian                 |
//! | 4..9   | random value fixed for the process       |
//! | 9..12  | wrapping counter, big-endian, random seed |

use chrono::Utc;
use serde::{Serialize, Serializer};
use std::{
    fmt,
    str::FromStr,
    sync::{
        OnceLock,
        atomic::{AtomicU32, Ordering},
    },
};
use thiserror::Error;
use uuid::Uuid;

const OBJECT_ID_LEN: usize = 12;
const COUNTER_MASK: u32 = 0x00ff_ffff;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ObjectIdError {
    #[error("the provided hex string is not a valid ObjectID: `{0}`")]
    InvalidHex(String),
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

struct ProcessSeed {
    unique: [u8; 5],
    counter: AtomicU32,
}

fn process_seed() -> &'static ProcessSeed {
    static SEED: OnceLock<ProcessSeed> = OnceLock::new();
    SEED.get_or_init(|| {
        let random = Uuid::new_v4();
        let bytes = random.as_bytes();
        let mut unique = [0u8; 5];
        unique.copy_from_slice(&bytes[..5]);
        let start = u32::from_be_bytes([0, bytes[5], bytes[6], bytes[7]]);
        ProcessSeed {
            unique,
            counter: AtomicU32::new(start),
        }
    })
}

impl ObjectId {
    /// Allocate a fresh identifier. Never repeats within a process.
    pub fn new() -> Self {
        let seed = process_seed();
        let seconds = Utc::now().timestamp().clamp(0, u32::MAX as i64) as u32;
        let count = seed.counter.fetch_add(1, Ordering::Relaxed) & COUNTER_MASK;

        let mut bytes = [0u8; OBJECT_ID_LEN];
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(&seed.unique);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);
        Self(bytes)
    }

    /// Lowercase hex form, as stored in the catalog and exposed over HTTP.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for ObjectId {
    type Err = ObjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != OBJECT_ID_LEN * 2 {
            return Err(ObjectIdError::InvalidHex(s.to_string()));
        }
        let mut bytes = [0u8; OBJECT_ID_LEN];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|_| ObjectIdError::InvalidHex(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}
