use std::fmt;

use serde::de::{self, Deserialize, Deserializer, Visitor};
use serde::ser::{Serialize, Serializer};

use error::{ErrorKind, Result};

const PREFIX: &str = "sha256:";
const HASH_LEN: usize = 52;
/// Length of `sha256:` + the 52-character hash, i.e. the offset of the `-`
/// separator.
const SEPARATOR_OFFSET: usize = PREFIX.len() + HASH_LEN;

/// The reserved ref for the empty-content blob. Never derivable by hashing;
/// it is a hard-coded sentinel with no file on disk.
pub const EMPTY_REF: &str = "sha256:SEOC8GKOVGE196NRUJ49IRTP4GJQSGF4CIDP6J54IMCHMU2IN1AG-0";

/// A canonical `sha256:<52-char base32hex hash>-<decimal size>` reference.
/// The empty string is a legal "unset" value distinct from `EMPTY_REF` (the
/// reserved ref for zero-length content).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobRef(String);

impl BlobRef {
	/// The unset value: an empty string, not to be confused with the
	/// reserved empty-content ref.
	pub fn unset() -> BlobRef {
		BlobRef(String::new())
	}

	/// The reserved ref for the empty-content blob.
	pub fn empty() -> BlobRef {
		BlobRef(EMPTY_REF.to_owned())
	}

	/// True for the unset value (`""`). Does *not* mean "empty content" —
	/// for that, compare against `BlobRef::empty()`.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// True for the reserved empty-content sentinel.
	pub fn is_empty_content(&self) -> bool {
		self.0 == EMPTY_REF
	}

	/// Parses and validates a ref string. The empty string is accepted as
	/// "unset". Everything else must match `sha256:<52 base32hex chars>-<digits>`.
	pub fn parse<S: Into<String>>(s: S) -> Result<BlobRef> {
		let s = s.into();
		if s.is_empty() {
			return Ok(BlobRef(s));
		}

		validate(&s)?;
		Ok(BlobRef(s))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// The 52-character base32hex hash component. Panics if unset; callers
	/// should check `is_empty()` first.
	pub fn hash(&self) -> &str {
		&self.0[PREFIX.len()..SEPARATOR_OFFSET]
	}

	/// The decimal size component, as a string.
	pub fn size_str(&self) -> &str {
		&self.0[SEPARATOR_OFFSET + 1..]
	}

	/// The two-character fan-out prefix of the hash.
	pub fn fan_out(&self) -> &str {
		&self.hash()[..2]
	}

	/// The remainder of the hash after the fan-out prefix.
	pub fn hash_remainder(&self) -> &str {
		&self.hash()[2..]
	}

	/// Builds a ref from a raw 32-byte SHA-256 digest and a content length.
	pub fn from_digest(digest: &[u8], size: u64) -> BlobRef {
		let hash = ::data_encoding::BASE32HEX_NOPAD.encode(digest);
		debug_assert_eq!(hash.len(), HASH_LEN);
		BlobRef(format!("{}{}-{}", PREFIX, hash, size))
	}
}

fn validate(s: &str) -> Result<()> {
	let bytes = s.as_bytes();

	if bytes.len() <= SEPARATOR_OFFSET || !s.starts_with(PREFIX) {
		bail!(invalid(s));
	}

	let hash = &bytes[PREFIX.len()..SEPARATOR_OFFSET];
	if !hash.iter().all(|&b| is_base32hex(b)) {
		bail!(invalid(s));
	}

	if bytes[SEPARATOR_OFFSET] != b'-' {
		bail!(invalid(s));
	}

	let size = &bytes[SEPARATOR_OFFSET + 1..];
	if size.is_empty() || !size.iter().all(u8::is_ascii_digit) {
		bail!(invalid(s));
	}

	Ok(())
}

fn is_base32hex(b: u8) -> bool {
	b.is_ascii_digit() || (b'A'..=b'V').contains(&b)
}

fn invalid(s: &str) -> ErrorKind {
	ErrorKind::InvalidInput(format!("{:?} is not a valid blob ref", s))
}

impl fmt::Display for BlobRef {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl Serialize for BlobRef {
	fn serialize<S: Serializer>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.0)
	}
}

impl<'de> Deserialize<'de> for BlobRef {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> ::std::result::Result<BlobRef, D::Error> {
		struct RefVisitor;

		impl<'de> Visitor<'de> for RefVisitor {
			type Value = BlobRef;

			fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
				f.write_str("a blob ref string")
			}

			fn visit_str<E: de::Error>(self, v: &str) -> ::std::result::Result<BlobRef, E> {
				BlobRef::parse(v).map_err(|e| E::custom(e.to_string()))
			}
		}

		deserializer.deserialize_str(RefVisitor)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn unset_is_legal() {
		assert!(BlobRef::parse("").unwrap().is_empty());
	}

	#[test]
	fn reserved_empty_ref_parses() {
		let r = BlobRef::parse(EMPTY_REF).unwrap();
		assert!(r.is_empty_content());
		assert_eq!(r.size_str(), "0");
	}

	#[test]
	fn rejects_wrong_prefix() {
		assert!(BlobRef::parse("sha512:AAAA-1").is_err());
	}

	#[test]
	fn rejects_lowercase_hash_chars() {
		let mut bad = EMPTY_REF.to_owned();
		bad.replace_range(7..8, "s");
		assert!(BlobRef::parse(bad).is_err());
	}

	#[test]
	fn rejects_missing_size() {
		let mut bad = EMPTY_REF.to_owned();
		bad.truncate(SEPARATOR_OFFSET + 1);
		assert!(BlobRef::parse(bad).is_err());
	}

	#[test]
	fn from_digest_matches_known_vector() {
		use sha2::{Digest, Sha256};
		let digest = Sha256::digest(b"hello, world!");
		let r = BlobRef::from_digest(&digest, 13);
		assert_eq!(r.as_str(), "sha256:D3J5DCIHSPV86M5UV143LC6L3HJ1JSV7K6KV1PQO73A1VSR8USK0-13");
	}

	#[test]
	fn fan_out_splits_hash_correctly() {
		let r = BlobRef::parse(EMPTY_REF).unwrap();
		assert_eq!(r.fan_out(), "SE");
		assert_eq!(format!("{}{}", r.fan_out(), r.hash_remainder()), r.hash());
	}
}
