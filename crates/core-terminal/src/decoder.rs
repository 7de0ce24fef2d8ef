//! Byte stream to [`CharUnit`] decoding.
//!
//! Bytes are pulled through a fixed 16-byte carry buffer. A unit is complete
//! once the number of bytes implied by its lead byte has arrived; bytes left
//! over from a fill stay in the carry for the next call. ESC followed by `[`
//! or `O` is assembled into a single unit holding the whole control sequence,
//! bounded by [`MAX_UNIT_BYTES`]. The bytes following ESC are only awaited for
//! one fill period: a lone ESC keypress is delivered on its own.

use crate::source::{ByteSource, Fill};
use core_text::{CharUnit, ESC, MAX_UNIT_BYTES, utf8_len};
use smallvec::{SmallVec, smallvec};
use std::collections::VecDeque;
use std::io;
use tracing::trace;

const CARRY_CAP: usize = 16;

type RawUnit = SmallVec<[u8; MAX_UNIT_BYTES]>;

/// Anything that yields decoded units until end of input.
pub trait KeySource {
    /// Next unit, or `None` once the input is exhausted.
    fn next_unit(&mut self) -> io::Result<Option<CharUnit>>;
}

#[derive(Clone, Copy)]
enum Wait {
    /// Retry on timeout until data or end of stream.
    Block,
    /// At most one fill attempt.
    Brief,
}

pub struct CharDecoder<S: ByteSource> {
    source: S,
    carry: [u8; CARRY_CAP],
    head: usize,
    tail: usize,
    eof: bool,
}

impl<S: ByteSource> CharDecoder<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            carry: [0; CARRY_CAP],
            head: 0,
            tail: 0,
            eof: false,
        }
    }

    /// Bytes already read from the source but not yet decoded.
    pub fn pending(&self) -> usize {
        self.tail - self.head
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Read one unit.
    ///
    /// Returns `Ok(None)` at end of stream with nothing pending. A unit cut
    /// short by end of stream is returned with the bytes that did arrive.
    ///
    /// # Errors
    /// Propagates source failures other than timeouts and interrupted waits,
    /// which are retried.
    pub fn read_char(&mut self) -> io::Result<Option<CharUnit>> {
        let Some(lead) = self.next_byte(Wait::Block)? else {
            return Ok(None);
        };
        if lead == ESC {
            return self.read_escape().map(Some);
        }
        let need = utf8_len(lead);
        let mut raw: RawUnit = smallvec![lead];
        while raw.len() < need {
            match self.next_byte(Wait::Block)? {
                Some(b) if b & 0xC0 == 0x80 => raw.push(b),
                Some(_) => {
                    self.unread();
                    break;
                }
                None => break,
            }
        }
        if raw.len() < need {
            trace!(target: "input.decode", have = raw.len(), need, "partial_unit");
        }
        Ok(Some(CharUnit::from_bytes(&raw)))
    }

    fn read_escape(&mut self) -> io::Result<CharUnit> {
        let mut raw: RawUnit = smallvec![ESC];
        match self.next_byte(Wait::Brief)? {
            Some(b @ (b'[' | b'O')) => raw.push(b),
            Some(_) => {
                self.unread();
                return Ok(CharUnit::from_bytes(&raw));
            }
            None => return Ok(CharUnit::from_bytes(&raw)),
        }
        if raw[1] == b'O' {
            if let Some(b) = self.next_byte(Wait::Brief)? {
                if is_final(b) {
                    raw.push(b);
                } else {
                    self.unread();
                }
            }
            return Ok(CharUnit::from_bytes(&raw));
        }
        while raw.len() < MAX_UNIT_BYTES {
            let Some(b) = self.next_byte(Wait::Brief)? else {
                break;
            };
            if is_final(b) {
                raw.push(b);
                break;
            }
            if (0x20..=0x3F).contains(&b) {
                raw.push(b);
            } else {
                self.unread();
                break;
            }
        }
        trace!(target: "input.decode", len = raw.len(), "escape_sequence");
        Ok(CharUnit::from_bytes(&raw))
    }

    fn next_byte(&mut self, wait: Wait) -> io::Result<Option<u8>> {
        while self.head == self.tail {
            if self.eof {
                return Ok(None);
            }
            self.head = 0;
            self.tail = 0;
            let filled = match self.source.fill(&mut self.carry) {
                Ok(fill) => fill,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => Fill::TimedOut,
                Err(err) => return Err(err),
            };
            match filled {
                Fill::Bytes(n) => self.tail = n.min(CARRY_CAP),
                Fill::Eof => self.eof = true,
                Fill::TimedOut => {
                    if let Wait::Brief = wait {
                        return Ok(None);
                    }
                }
            }
        }
        let b = self.carry[self.head];
        self.head += 1;
        Ok(Some(b))
    }

    /// Push back the byte most recently returned by `next_byte`.
    fn unread(&mut self) {
        debug_assert!(self.head > 0);
        self.head = self.head.saturating_sub(1);
    }
}

fn is_final(b: u8) -> bool {
    (0x40..=0x7E).contains(&b)
}

impl<S: ByteSource> KeySource for CharDecoder<S> {
    fn next_unit(&mut self) -> io::Result<Option<CharUnit>> {
        self.read_char()
    }
}

/// Input that never yields anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInput;

impl KeySource for NoInput {
    fn next_unit(&mut self) -> io::Result<Option<CharUnit>> {
        Ok(None)
    }
}

/// Replays queued units before falling through to another source.
pub struct SeededInput<K> {
    queued: VecDeque<CharUnit>,
    inner: K,
}

impl<K: KeySource> SeededInput<K> {
    pub fn new(queued: impl IntoIterator<Item = CharUnit>, inner: K) -> Self {
        Self {
            queued: queued.into_iter().collect(),
            inner,
        }
    }

    /// Decode `bytes` up front and queue the resulting units.
    pub fn from_bytes(bytes: &[u8], inner: K) -> io::Result<Self> {
        let mut decoder = CharDecoder::new(crate::SliceSource::new(bytes.to_vec()));
        let mut queued = VecDeque::new();
        while let Some(unit) = decoder.read_char()? {
            queued.push_back(unit);
        }
        Ok(Self { queued, inner })
    }

    pub fn queued(&self) -> usize {
        self.queued.len()
    }

    pub fn inner_mut(&mut self) -> &mut K {
        &mut self.inner
    }
}

impl<K: KeySource> KeySource for SeededInput<K> {
    fn next_unit(&mut self) -> io::Result<Option<CharUnit>> {
        match self.queued.pop_front() {
            Some(unit) => Ok(Some(unit)),
            None => self.inner.next_unit(),
        }
    }
}
