//! A backtracking regular expression engine compatible in syntax and
//! semantics with the .NET/Perl5 family.
//!
//! Most Rust code should reach for the linear-time `regex` crate. This
//! crate exists for the patterns that engine family provably cannot run:
//! backreferences, lookahead and lookbehind, atomic groups `(?>..)`,
//! balancing groups `(?<a-b>..)`, conditionals `(?(n)..|..)` and
//! right-to-left matching. In exchange, matching may backtrack
//! exponentially; callers are expected to bound pathological patterns
//! with a match timeout.
//!
//! # Usage
//!
//! Compile a pattern once and match repeatedly:
//!
//! ```
//! use recoil::Regex;
//!
//! let re = Regex::new(r"(?<word>\w+)").unwrap();
//! let m = re.find("hello world").unwrap().unwrap();
//! assert_eq!(m.named("word").unwrap().value(), "hello");
//! let next = re.find_next(&m).unwrap().unwrap();
//! assert_eq!(next.range(), 6..11);
//! ```
//!
//! Atomic groups cut backtracking the way `(?>..)` does in .NET and Perl:
//!
//! ```
//! use recoil::Regex;
//!
//! let re = Regex::new(r"(?>a+)a").unwrap();
//! assert!(!re.is_match("aaaa").unwrap());
//! ```
//!
//! # Positions are scalar indices
//!
//! The engine decodes the input into a sequence of Unicode scalar values
//! before matching; every index and length reported by [`Match`],
//! [`Group`] and [`Capture`] counts scalars, not bytes.
//!
//! # Timeouts
//!
//! A deliberately adversarial pattern such as `(a+)+b` can take time
//! exponential in the input length. [`Regex::set_match_timeout`] arms a
//! deadline that every subsequent match attempt honors:
//!
//! ```
//! use std::time::Duration;
//! use recoil::{Error, Regex};
//!
//! let mut re = Regex::new(r"(a+)+b").unwrap();
//! re.set_match_timeout(Duration::from_millis(50));
//! match re.is_match(&"a".repeat(40)) {
//!     Err(Error::Timeout { .. }) => {}
//!     other => panic!("expected a timeout, got {:?}", other),
//! }
//! ```

#![deny(missing_docs)]

pub use crate::error::Error;
pub use crate::matches::{Capture, Group, Match};
pub use crate::parse::{escape, unescape};
pub use crate::re::{Matches, Regex, RegexOptions};

mod charclass;
mod compile;
mod error;
mod exec;
mod expand;
mod matches;
mod parse;
mod pool;
mod prefix;
mod prog;
mod re;
