//! Time-sortable 64-bit identifiers.
//!
//! ```text
//!  63         62..........15 14........4  3..0
//! |sign=0|        time (48)  | slice (11)|ver(4)|
//! ```
//!
//! `time` is a count of 10-microsecond intervals since 2026-01-01T00:00:00Z.
//! `slice` tie-breaks IDs minted within the same interval. `ver` is the
//! encoding version (currently 1). Numeric order over valid IDs equals
//! chronological order, and the string encoding of §6.1 preserves that
//! order lexicographically.

use std::fmt;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::de::{self, Deserialize, Deserializer, Visitor};
use serde::ser::{Serialize, Serializer};

use error::{Error, ErrorKind, Result};

/// Seconds from the Unix epoch to 2026-01-01T00:00:00Z.
const EPOCH_UNIX_SECONDS: u64 = 1_767_225_600;
const INTERVAL_MICROS: u64 = 10;
const MAX_SLICE: u16 = 0x07FF;
const CURRENT_VERSION: u64 = 1;

const VERSION_BITS: u32 = 4;
const SLICE_BITS: u32 = 11;
const TIME_SHIFT: u32 = VERSION_BITS + SLICE_BITS;

/// Sortable alphabet, strict ASCII order: `-0-9A-Z_a-z`.
pub const ALPHABET: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

/// A time-sortable 64-bit identifier. `Id::zero()` is the unset value and is
/// never produced by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Id(u64);

impl Id {
	/// The unset/zero ID. Never returned by `new_id`/`new_id_sliced`.
	pub const ZERO: Id = Id(0);

	/// Wraps a raw 64-bit value without validating its bit layout.
	pub fn from_u64(value: u64) -> Id {
		Id(value)
	}

	/// The raw 64-bit value.
	pub fn as_u64(&self) -> u64 {
		self.0
	}

	/// True for `Id::ZERO`.
	pub fn is_zero(&self) -> bool {
		self.0 == 0
	}

	fn pack(time: u64, slice: u16, version: u64) -> Id {
		Id((time << TIME_SHIFT) | ((slice as u64) << VERSION_BITS) | version)
	}

	/// Lexicographically sortable string encoding (§6.1).
	pub fn encode(&self) -> String {
		encode(self.0)
	}

	/// Inverse of `encode`. Accepts `""` and `"-"` as zero.
	pub fn decode(s: &str) -> Result<Id> {
		decode(s).map(Id)
	}
}

impl fmt::Display for Id {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}", self.encode())
	}
}

impl Serialize for Id {
	fn serialize<S: Serializer>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.encode())
	}
}

impl<'de> Deserialize<'de> for Id {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> ::std::result::Result<Id, D::Error> {
		struct IdVisitor;

		impl<'de> Visitor<'de> for IdVisitor {
			type Value = Id;

			fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
				f.write_str("a sortable id string")
			}

			fn visit_str<E: de::Error>(self, v: &str) -> ::std::result::Result<Id, E> {
				Id::decode(v).map_err(|e| E::custom(e.to_string()))
			}
		}

		deserializer.deserialize_str(IdVisitor)
	}
}

/// Encodes a raw 64-bit value as 11 six-bit big-endian digits with leading
/// `-` characters stripped. `encode(0) == "-"`.
pub fn encode(id: u64) -> String {
	let mut digits = [0u8; 11];
	for (i, slot) in digits.iter_mut().enumerate() {
		let shift = 60 - 6 * i as u32;
		let group = ((id >> shift) & 0x3F) as usize;
		*slot = ALPHABET[group];
	}

	let first_significant = digits.iter().position(|&b| b != b'-').unwrap_or(10);
	String::from_utf8(digits[first_significant..].to_vec()).expect("alphabet is ascii")
}

/// Decodes the string encoding of `encode`. Empty string and `"-"` both
/// decode to zero. Rejects inputs longer than 11 characters or containing
/// any byte outside the alphabet.
pub fn decode(s: &str) -> Result<u64> {
	if s.len() > 11 {
		bail!(ErrorKind::InvalidInput(format!("id string {:?} is longer than 11 characters", s)));
	}

	let mut value: u64 = 0;
	let padding = 11 - s.len();

	for _ in 0..padding {
		value <<= 6;
	}

	for byte in s.bytes() {
		let group = alphabet_index(byte).ok_or_else(|| {
			Error::from(ErrorKind::InvalidInput(format!("byte {:#x} is not in the id alphabet", byte)))
		})?;
		value = (value << 6) | group as u64;
	}

	Ok(value)
}

fn alphabet_index(byte: u8) -> Option<u8> {
	if byte >= 128 {
		return None;
	}
	ALPHABET.iter().position(|&c| c == byte).map(|p| p as u8)
}

/// Mutable state of the process-wide generator: the last interval an ID was
/// minted in, and the slice used within it.
#[derive(Debug, Default)]
struct GeneratorState {
	last_interval: u64,
	slice: u16,
}

static GENERATOR: Lazy<Mutex<GeneratorState>> = Lazy::new(|| Mutex::new(GeneratorState::default()));

/// Computes the slice to use for `interval` given the generator's previous
/// state and the (start, stride) pair for this call, without touching the
/// system clock. Returns `None` when the slice space for `interval` is
/// exhausted and the caller must sleep and retry on a later interval.
fn next_slice(state: &mut GeneratorState, interval: u64, start: u16, stride: u16) -> Option<u16> {
	let slice = if interval == state.last_interval {
		state.slice.checked_add(stride)?
	} else {
		start
	};

	if slice > MAX_SLICE {
		return None;
	}

	state.last_interval = interval;
	state.slice = slice;
	Some(slice)
}

fn current_interval() -> u64 {
	let now = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("system clock is before the Unix epoch");
	let micros = now.as_secs() * 1_000_000 + u64::from(now.subsec_micros());
	let epoch_micros = EPOCH_UNIX_SECONDS * 1_000_000;
	micros.saturating_sub(epoch_micros) / INTERVAL_MICROS
}

/// Mints a new `Id`. Monotonic within one process: two IDs produced in order
/// by this function are strictly increasing.
pub fn new_id() -> Id {
	new_id_sliced(0, 1)
}

/// Mints a new `Id`, partitioning the slice space for instance `instance` of
/// `of_n` cooperating instances so that they cannot collide within the same
/// 10-microsecond interval. Falls back to the single-instance behavior of
/// `new_id` when `of_n <= 1`.
pub fn new_id_sliced(instance: u16, of_n: u16) -> Id {
	let (start, stride) = if of_n <= 1 { (0, 1) } else { (instance, of_n) };

	loop {
		let interval = current_interval();
		let mut state = GENERATOR.lock();

		match next_slice(&mut state, interval, start, stride) {
			Some(slice) => return Id::pack(interval, slice, CURRENT_VERSION),
			None => {
				drop(state);
				thread::sleep(Duration::from_micros(1));
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use quickcheck::TestResult;

	#[test]
	fn zero_id_encodes_to_dash() {
		assert_eq!(encode(0), "-");
		assert_eq!(decode("-").unwrap(), 0);
		assert_eq!(decode("").unwrap(), 0);
	}

	#[test]
	fn small_values_round_trip() {
		assert_eq!(encode(1), "0");
		assert_eq!(decode("0").unwrap(), 1);
	}

	#[test]
	fn decode_rejects_overlength_input() {
		assert!(decode("012345678901").is_err());
	}

	#[test]
	fn decode_rejects_illegal_byte() {
		assert!(decode("!").is_err());
		assert!(decode("\u{00e9}").is_err());
	}

	#[test]
	fn new_id_is_monotonic_across_many_calls() {
		let mut last = Id::ZERO;
		for _ in 0..5000 {
			let id = new_id();
			assert!(id > last, "{:?} should be greater than {:?}", id, last);
			last = id;
		}
	}

	#[test]
	fn slice_space_exhaustion_forces_interval_to_advance() {
		let mut state = GeneratorState { last_interval: 7, slice: 0 };
		for expected in 1..=MAX_SLICE {
			assert_eq!(next_slice(&mut state, 7, 0, 1), Some(expected));
		}
		assert_eq!(next_slice(&mut state, 7, 0, 1), None);
		// a later interval always resets the slice to `start`.
		assert_eq!(next_slice(&mut state, 8, 0, 1), Some(0));
	}

	#[test]
	fn sliced_instances_never_collide_within_an_interval() {
		let mut a = GeneratorState { last_interval: 0, slice: 0 };
		let mut b = GeneratorState { last_interval: 0, slice: 0 };

		let mut seen = ::std::collections::HashSet::new();
		for _ in 0..100 {
			seen.insert(next_slice(&mut a, 1, 0, 2).unwrap());
			seen.insert(next_slice(&mut b, 1, 1, 2).unwrap());
		}
		// instance 0 only ever produces even slices, instance 1 only odd ones.
		assert!(seen.iter().filter(|&&s| s % 2 == 0).count() > 0);
		assert!(seen.iter().filter(|&&s| s % 2 == 1).count() > 0);
	}

	quickcheck! {
		fn encode_decode_roundtrips(raw: u64) -> bool {
			decode(&encode(raw)).unwrap() == raw
		}

		fn numeric_order_equals_lexicographic_order(a: u64, b: u64) -> TestResult {
			if a == b {
				return TestResult::discard();
			}
			let (lo, hi) = if a < b { (a, b) } else { (b, a) };
			TestResult::from_bool(encode(lo) < encode(hi))
		}
	}
}
