//! SNMPv3 User-based Security Model (RFC 3414, RFC 3826, RFC 7860).
//!
//! - protocol and security level identifiers (this module)
//! - key localization and HMAC authentication ([`auth`])
//! - DES / 3DES / AES privacy ([`privacy`])
//! - USM security parameters ([`usm`])
//! - authoritative engine state and REPORT classification ([`engine`])

pub mod auth;
pub mod engine;
pub mod privacy;
pub mod usm;

pub use auth::LocalizedKey;
pub use engine::{EngineState, UsmReport};
pub use privacy::{PrivKey, SaltCounter};
pub use usm::UsmSecurityParams;

/// How a localized key is stretched when the privacy cipher needs more
/// key material than the authentication digest provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum KeyExtension {
    #[default]
    None,
    /// draft-blumenthal-aes-usm-04, used by AES-192/256.
    Blumenthal,
    /// draft-reeder-snmpv3-usm-3desede-00, used by 3DES.
    Reeder,
}

/// Error returned when a protocol or level name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseProtocolError {
    input: String,
    kind: NameKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NameKind {
    Auth,
    Priv,
    Level,
}

impl ParseProtocolError {
    /// The text that failed to parse.
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl std::fmt::Display for ParseProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            NameKind::Auth => write!(
                f,
                "unknown authentication protocol '{}'; expected one of: SHA1, MD5, HMAC128SHA224, HMAC192SHA256, HMAC256SHA384, HMAC384SHA512",
                self.input
            ),
            NameKind::Priv => write!(
                f,
                "unknown privacy protocol '{}'; expected one of: AES128, AES192, AES256, DES, 3DES",
                self.input
            ),
            NameKind::Level => write!(
                f,
                "unknown security level '{}'; expected one of: AUTH_PRIV, AUTH_NOPRIV, NOAUTH_NOPRIV",
                self.input
            ),
        }
    }
}

impl std::error::Error for ParseProtocolError {}

/// Uppercase with separators removed, so `HMAC192-SHA256`, `sha_256` and
/// `Sha256` compare equal to their canonical spellings.
fn normalize(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Authentication protocol identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthProtocol {
    /// HMAC-MD5-96 (RFC 3414)
    Md5,
    /// HMAC-SHA-96 (RFC 3414)
    Sha1,
    /// HMAC-SHA-224 truncated to 128 bits (RFC 7860, `HMAC128SHA224`)
    Sha224,
    /// HMAC-SHA-256 truncated to 192 bits (RFC 7860, `HMAC192SHA256`)
    Sha256,
    /// HMAC-SHA-384 truncated to 256 bits (RFC 7860, `HMAC256SHA384`)
    Sha384,
    /// HMAC-SHA-512 truncated to 384 bits (RFC 7860, `HMAC384SHA512`)
    Sha512,
}

impl std::fmt::Display for AuthProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Md5 => write!(f, "MD5"),
            Self::Sha1 => write!(f, "SHA1"),
            Self::Sha224 => write!(f, "HMAC128SHA224"),
            Self::Sha256 => write!(f, "HMAC192SHA256"),
            Self::Sha384 => write!(f, "HMAC256SHA384"),
            Self::Sha512 => write!(f, "HMAC384SHA512"),
        }
    }
}

impl std::str::FromStr for AuthProtocol {
    type Err = ParseProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "MD5" | "HMACMD5" | "HMACMD596" => Ok(Self::Md5),
            "SHA" | "SHA1" | "HMACSHA" | "HMACSHA96" => Ok(Self::Sha1),
            "SHA224" | "HMAC128SHA224" => Ok(Self::Sha224),
            "SHA256" | "HMAC192SHA256" => Ok(Self::Sha256),
            "SHA384" | "HMAC256SHA384" => Ok(Self::Sha384),
            "SHA512" | "HMAC384SHA512" => Ok(Self::Sha512),
            _ => Err(ParseProtocolError {
                input: s.to_string(),
                kind: NameKind::Auth,
            }),
        }
    }
}

impl AuthProtocol {
    /// Digest output length, which is also the localized key length.
    pub fn digest_len(self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha1 => 20,
            Self::Sha224 => 28,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Truncated MAC length carried in msgAuthenticationParameters.
    pub fn mac_len(self) -> usize {
        match self {
            Self::Md5 | Self::Sha1 => 12,
            Self::Sha224 => 16,
            Self::Sha256 => 24,
            Self::Sha384 => 32,
            Self::Sha512 => 48,
        }
    }
}

/// Privacy protocol identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivProtocol {
    /// AES-128-CFB (RFC 3826)
    Aes128,
    /// AES-192-CFB with Blumenthal key extension
    Aes192,
    /// AES-256-CFB with Blumenthal key extension
    Aes256,
    /// DES-CBC (RFC 3414 Section 8)
    Des,
    /// 3DES-EDE-CBC with Reeder key extension
    Des3,
}

impl std::fmt::Display for PrivProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Aes128 => write!(f, "AES128"),
            Self::Aes192 => write!(f, "AES192"),
            Self::Aes256 => write!(f, "AES256"),
            Self::Des => write!(f, "DES"),
            Self::Des3 => write!(f, "3DES"),
        }
    }
}

impl std::str::FromStr for PrivProtocol {
    type Err = ParseProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "AES" | "AES128" | "AESCFB128" => Ok(Self::Aes128),
            "AES192" | "AESCFB192" => Ok(Self::Aes192),
            "AES256" | "AESCFB256" => Ok(Self::Aes256),
            "DES" | "DESCBC" | "CBCDES" => Ok(Self::Des),
            "3DES" | "3DESEDE" | "DES3" | "TDES" | "TRIPLEDES" => Ok(Self::Des3),
            _ => Err(ParseProtocolError {
                input: s.to_string(),
                kind: NameKind::Priv,
            }),
        }
    }
}

impl PrivProtocol {
    /// Localized key material the cipher consumes.
    pub fn key_len(self) -> usize {
        match self {
            Self::Des => 16,  // 8 key + 8 pre-IV
            Self::Des3 => 32, // 24 key + 8 pre-IV
            Self::Aes128 => 16,
            Self::Aes192 => 24,
            Self::Aes256 => 32,
        }
    }

    /// Key extension needed when `auth` yields too little key material.
    pub(crate) fn key_extension_for(self, auth: AuthProtocol) -> KeyExtension {
        if auth.digest_len() >= self.key_len() {
            return KeyExtension::None;
        }
        match self {
            Self::Des3 => KeyExtension::Reeder,
            Self::Aes192 | Self::Aes256 => KeyExtension::Blumenthal,
            Self::Des | Self::Aes128 => KeyExtension::None,
        }
    }
}

/// USM security level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SecurityLevel {
    NoAuthNoPriv,
    AuthNoPriv,
    AuthPriv,
}

impl SecurityLevel {
    pub fn requires_auth(self) -> bool {
        matches!(self, Self::AuthNoPriv | Self::AuthPriv)
    }

    pub fn requires_priv(self) -> bool {
        matches!(self, Self::AuthPriv)
    }
}

impl std::fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoAuthNoPriv => write!(f, "NOAUTH_NOPRIV"),
            Self::AuthNoPriv => write!(f, "AUTH_NOPRIV"),
            Self::AuthPriv => write!(f, "AUTH_PRIV"),
        }
    }
}

impl std::str::FromStr for SecurityLevel {
    type Err = ParseProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "AUTHPRIV" => Ok(Self::AuthPriv),
            "AUTHNOPRIV" => Ok(Self::AuthNoPriv),
            "NOAUTHNOPRIV" => Ok(Self::NoAuthNoPriv),
            _ => Err(ParseProtocolError {
                input: s.to_string(),
                kind: NameKind::Level,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_protocol_table_names() {
        for (name, expected) in [
            ("SHA1", AuthProtocol::Sha1),
            ("MD5", AuthProtocol::Md5),
            ("HMAC128SHA224", AuthProtocol::Sha224),
            ("HMAC192SHA256", AuthProtocol::Sha256),
            ("HMAC256SHA384", AuthProtocol::Sha384),
            ("HMAC384SHA512", AuthProtocol::Sha512),
        ] {
            assert_eq!(name.parse::<AuthProtocol>().unwrap(), expected);
            assert_eq!(expected.to_string(), name);
        }
    }

    #[test]
    fn test_auth_protocol_aliases() {
        assert_eq!("sha".parse::<AuthProtocol>().unwrap(), AuthProtocol::Sha1);
        assert_eq!("SHA-256".parse::<AuthProtocol>().unwrap(), AuthProtocol::Sha256);
        assert_eq!("hmac192-sha256".parse::<AuthProtocol>().unwrap(), AuthProtocol::Sha256);
        assert!("SHA3".parse::<AuthProtocol>().is_err());
    }

    #[test]
    fn test_priv_protocol_table_names() {
        for (name, expected) in [
            ("AES128", PrivProtocol::Aes128),
            ("AES192", PrivProtocol::Aes192),
            ("AES256", PrivProtocol::Aes256),
            ("DES", PrivProtocol::Des),
            ("3DES", PrivProtocol::Des3),
        ] {
            assert_eq!(name.parse::<PrivProtocol>().unwrap(), expected);
            assert_eq!(expected.to_string(), name);
        }
        assert_eq!("aes".parse::<PrivProtocol>().unwrap(), PrivProtocol::Aes128);
        assert_eq!("AES-256".parse::<PrivProtocol>().unwrap(), PrivProtocol::Aes256);
        assert!("blowfish".parse::<PrivProtocol>().is_err());
    }

    #[test]
    fn test_security_level_names() {
        assert_eq!("AUTH_PRIV".parse::<SecurityLevel>().unwrap(), SecurityLevel::AuthPriv);
        assert_eq!("AUTH_NOPRIV".parse::<SecurityLevel>().unwrap(), SecurityLevel::AuthNoPriv);
        assert_eq!(
            "NOAUTH_NOPRIV".parse::<SecurityLevel>().unwrap(),
            SecurityLevel::NoAuthNoPriv
        );
        assert_eq!("authPriv".parse::<SecurityLevel>().unwrap(), SecurityLevel::AuthPriv);
        assert_eq!(
            "noAuthNoPriv".parse::<SecurityLevel>().unwrap(),
            SecurityLevel::NoAuthNoPriv
        );
        let err = "AUTH".parse::<SecurityLevel>().unwrap_err();
        assert_eq!(err.input(), "AUTH");
        assert!(err.to_string().contains("security level"));
    }

    #[test]
    fn test_key_extension_selection() {
        assert_eq!(
            PrivProtocol::Aes256.key_extension_for(AuthProtocol::Sha1),
            KeyExtension::Blumenthal
        );
        assert_eq!(
            PrivProtocol::Aes192.key_extension_for(AuthProtocol::Md5),
            KeyExtension::Blumenthal
        );
        assert_eq!(
            PrivProtocol::Des3.key_extension_for(AuthProtocol::Sha1),
            KeyExtension::Reeder
        );
        assert_eq!(
            PrivProtocol::Des3.key_extension_for(AuthProtocol::Sha256),
            KeyExtension::None
        );
        assert_eq!(
            PrivProtocol::Aes128.key_extension_for(AuthProtocol::Md5),
            KeyExtension::None
        );
    }

    #[test]
    fn test_mac_lengths() {
        assert_eq!(AuthProtocol::Md5.mac_len(), 12);
        assert_eq!(AuthProtocol::Sha224.mac_len(), 16);
        assert_eq!(AuthProtocol::Sha512.mac_len(), 48);
    }
}
