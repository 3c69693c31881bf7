/* STATIC Proxy (AGPL-3.0)

Copyright (C) 2025 - 404 Contributors

This program is free software: you can redistribute it and/or modify
it under the terms of the GNU Affero General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
GNU Affero General Public License for more details.

You should have received a copy of the GNU Affero General Public License
along with this program.  If not, see <https://www.gnu.org/licenses/>.

*/

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic identifier source for artifact pairs.
///
/// The start value is an explicit constructor argument so every `Interceptor` (and every
/// test) owns an independent counter. Values handed out by [`SequenceCounter::next`] are
/// unique for the lifetime of the counter; nothing is persisted, so a restarted process
/// starts from whatever value it is constructed with again.
#[derive(Debug)]
pub struct SequenceCounter {
    next: AtomicU64,
}

impl SequenceCounter {
    pub fn new(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }

    /// Reserves the next identifier. Reserved values are never returned again, even when
    /// the caller abandons the work they were reserved for.
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Value the next call to [`SequenceCounter::next`] will return.
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

impl Default for SequenceCounter {
    fn default() -> Self {
        Self::new(0)
    }
}
