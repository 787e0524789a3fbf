//! Object Identifier (OID) type.
//!
//! OIDs are stored as arcs in a `SmallVec`, so the common case (system and
//! interface scalars) never allocates.

use crate::error::{Error, OidErrorKind, Result};
use smallvec::SmallVec;
use std::fmt;

/// Maximum number of arcs accepted (RFC 2578 Section 3.5).
pub const MAX_OID_LEN: usize = 128;

/// Object Identifier.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Oid {
    arcs: SmallVec<[u32; 16]>,
}

impl Oid {
    /// Create an OID from arc values without validation.
    pub fn from_slice(arcs: &[u32]) -> Self {
        Self {
            arcs: SmallVec::from_slice(arcs),
        }
    }

    /// Parse dotted-decimal notation. A single leading dot is accepted
    /// (`.1.3.6.1` and `1.3.6.1` are the same OID).
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let body = trimmed.strip_prefix('.').unwrap_or(trimmed);
        if body.is_empty() {
            return Err(Error::invalid_oid_with_input(OidErrorKind::Empty, s));
        }

        let mut arcs = SmallVec::new();
        for part in body.split('.') {
            let arc = part
                .parse::<u32>()
                .map_err(|_| Error::invalid_oid_with_input(OidErrorKind::InvalidArc, s))?;
            arcs.push(arc);
        }

        let oid = Self { arcs };
        oid.validate().map_err(|kind| Error::invalid_oid_with_input(kind, s))?;
        Ok(oid)
    }

    fn validate(&self) -> std::result::Result<(), OidErrorKind> {
        if self.arcs.len() < 2 {
            return Err(OidErrorKind::TooShort);
        }
        if self.arcs.len() > MAX_OID_LEN {
            return Err(OidErrorKind::TooManyArcs {
                count: self.arcs.len(),
                max: MAX_OID_LEN,
            });
        }
        let (first, second) = (self.arcs[0], self.arcs[1]);
        if first > 2 {
            return Err(OidErrorKind::InvalidFirstArc(first));
        }
        if first < 2 && second >= 40 {
            return Err(OidErrorKind::InvalidSecondArc { first, second });
        }
        Ok(())
    }

    /// Arc values.
    pub fn arcs(&self) -> &[u32] {
        &self.arcs
    }

    /// Number of arcs.
    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    /// Whether the OID has no arcs.
    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }

    /// Whether `self` equals `prefix` or lies beneath it in the tree.
    pub fn starts_with(&self, prefix: &Oid) -> bool {
        self.arcs.starts_with(&prefix.arcs)
    }

    /// BER content octets (X.690 Section 8.19).
    ///
    /// The first two arcs are packed into one subidentifier; every
    /// subidentifier is base-128 with the high bit as continuation flag.
    pub fn to_ber(&self) -> SmallVec<[u8; 64]> {
        let mut out = SmallVec::new();
        let mut subids = self.arcs.iter().copied();
        let first = match (subids.next(), subids.next()) {
            (Some(a), Some(b)) => a.wrapping_mul(40).wrapping_add(b),
            (Some(a), None) => a.wrapping_mul(40),
            _ => return out,
        };
        push_base128(&mut out, first);
        for subid in subids {
            push_base128(&mut out, subid);
        }
        out
    }

    /// Decode BER content octets. Returns `None` for malformed encodings.
    pub fn from_ber(data: &[u8]) -> Option<Self> {
        if data.is_empty() {
            return Some(Self::from_slice(&[]));
        }

        let mut arcs: SmallVec<[u32; 16]> = SmallVec::new();
        let mut value: u32 = 0;
        let mut in_progress = false;
        for &byte in data {
            if !in_progress && byte == 0x80 {
                // Non-minimal subidentifier.
                return None;
            }
            value = value.checked_mul(128)? | u32::from(byte & 0x7F);
            in_progress = byte & 0x80 != 0;
            if !in_progress {
                if arcs.is_empty() {
                    let (a, b) = match value {
                        0..=39 => (0, value),
                        40..=79 => (1, value - 40),
                        _ => (2, value - 80),
                    };
                    arcs.push(a);
                    arcs.push(b);
                } else {
                    arcs.push(value);
                }
                if arcs.len() > MAX_OID_LEN {
                    return None;
                }
                value = 0;
            }
        }
        if in_progress {
            return None;
        }
        Some(Self { arcs })
    }
}

fn push_base128(out: &mut SmallVec<[u8; 64]>, value: u32) {
    let mut groups = [0u8; 5];
    let mut count = 0;
    let mut rest = value;
    loop {
        groups[count] = (rest & 0x7F) as u8;
        count += 1;
        rest >>= 7;
        if rest == 0 {
            break;
        }
    }
    for i in (0..count).rev() {
        let continuation = if i > 0 { 0x80 } else { 0 };
        out.push(groups[i] | continuation);
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut arcs = self.arcs.iter();
        if let Some(first) = arcs.next() {
            write!(f, "{}", first)?;
            for arc in arcs {
                write!(f, ".{}", arc)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({})", self)
    }
}

impl std::str::FromStr for Oid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Build an [`Oid`] from literal arcs: `oid!(1, 3, 6, 1, 2, 1, 1, 5, 0)`.
#[macro_export]
macro_rules! oid {
    ($($arc:expr),+ $(,)?) => {
        $crate::oid::Oid::from_slice(&[$($arc),+])
    };
}
