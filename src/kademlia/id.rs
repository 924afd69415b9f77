// src/kademlia/id.rs
//
// 160-bit opaque identifiers and the XOR distance metric.

use rand::RngCore;
use std::fmt;

pub const ID_LEN: usize = 20;

/// A 160-bit opaque identifier: a node id or a storage key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(pub [u8; ID_LEN]);

impl Id {
    pub fn zero() -> Self {
        Id([0u8; ID_LEN])
    }

    pub fn random() -> Self {
        let mut buf = [0u8; ID_LEN];
        rand::thread_rng().fill_bytes(&mut buf);
        Id(buf)
    }

    pub fn from_bytes(bytes: [u8; ID_LEN]) -> Self {
        Id(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ID_LEN] {
        &self.0
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut buf = [0u8; ID_LEN];
        hex::decode_to_slice(s, &mut buf)?;
        Ok(Id(buf))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// XOR distance, interpreted as an unsigned 160-bit integer.
    /// `Ord` on the returned `Distance` compares lexicographically byte by
    /// byte, which is equivalent to unsigned big-endian integer comparison.
    pub fn distance(&self, other: &Id) -> Distance {
        let mut out = [0u8; ID_LEN];
        for i in 0..ID_LEN {
            out[i] = self.0[i] ^ other.0[i];
        }
        Distance(out)
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({}…)", &self.to_hex()[..8])
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Hex string representation, used by the commit log's JSON records.
impl serde::Serialize for Id {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Distance(pub [u8; ID_LEN]);

impl Distance {
    pub const MAX: Distance = Distance([0xff; ID_LEN]);

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ID_LEN]
    }

    /// Index (0..160) of the most significant set bit, i.e. the k-bucket
    /// this distance falls into. 0 is the bucket farthest from the local
    /// node (the distance's top bit is set); 159 is the bucket nearest to
    /// it (only the bottom bit differs). Panics if the distance is zero —
    /// callers must filter self-distance first.
    pub fn bucket_index(&self) -> usize {
        let leading_zero_bits: usize = {
            let mut count = 0;
            let mut found = false;
            for byte in self.0.iter() {
                if *byte == 0 {
                    count += 8;
                } else {
                    count += byte.leading_zeros() as usize;
                    found = true;
                    break;
                }
            }
            assert!(found, "bucket_index called on zero distance");
            count
        };
        ID_LEN * 8 - 1 - leading_zero_bits
    }
}
