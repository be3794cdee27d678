// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Short identifier issuing for linkcache.
//!
//! - [`IdPool`] hands out identifiers, preferring reclaimed ones and falling back to minting.
//!   Reclamation runs in the background, at most once at a time, under a timeout.
//! - [`IdStack`] is the LIFO container of reclaimed identifiers.
//! - [`validate`] checks the six-character base-62 shape of an identifier; [`mint`] derives
//!   a new one from a URL and the current time.

mod alphabet;
mod pool;
mod stack;

#[doc(inline)]
pub use alphabet::{ALPHABET, ID_LEN, InvalidId, mint, validate};
#[doc(inline)]
pub use pool::{IdPool, PoolConfig, ReclaimOutcome};
#[doc(inline)]
pub use stack::IdStack;
