//! Raw terminal capture: attribute guard, byte sources and the character decoder.
//!
//! The interactive read loop needs a terminal in cbreak-style mode: no line
//! buffering, no local echo, carriage return delivered as-is, but signal
//! generation left on so `^C` still raises SIGINT (which `signal` turns into a
//! no-op for the pending read). [`RawMode`] applies those settings and puts
//! the captured attributes back when dropped, on every exit path including
//! `?` propagation and unwinding panics.

use anyhow::{Context, Result};
use nix::sys::termios::{
    InputFlags, LocalFlags, SetArg, SpecialCharacterIndices, Termios, tcgetattr, tcsetattr,
};
use std::fmt;
use std::io::{self, Stdin};
use tracing::{debug, warn};

pub mod decoder;
pub mod signal;
pub mod source;

pub use decoder::{CharDecoder, KeySource, NoInput, SeededInput};
pub use source::{ByteSource, Fill, SliceSource, TtySource};

/// When a new attribute set takes effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Apply {
    /// Immediately.
    Now,
    /// After pending output drains; unread input is discarded.
    Flush,
}

/// Access to a terminal's attribute block.
pub trait AttrPort {
    type Attrs: Clone + PartialEq + fmt::Debug;

    fn get(&mut self) -> io::Result<Self::Attrs>;
    fn set(&mut self, attrs: &Self::Attrs, when: Apply) -> io::Result<()>;
    /// Derive the interactive attribute set from the captured one.
    fn make_raw(&self, attrs: &Self::Attrs) -> Self::Attrs;
}

/// termios on the process's standard input.
pub struct TtyPort {
    stdin: Stdin,
}

impl Default for TtyPort {
    fn default() -> Self {
        Self::new()
    }
}

impl TtyPort {
    pub fn new() -> Self {
        Self {
            stdin: io::stdin(),
        }
    }
}

impl AttrPort for TtyPort {
    type Attrs = Termios;

    fn get(&mut self) -> io::Result<Termios> {
        tcgetattr(&self.stdin).map_err(io::Error::from)
    }

    fn set(&mut self, attrs: &Termios, when: Apply) -> io::Result<()> {
        let arg = match when {
            Apply::Now => SetArg::TCSANOW,
            Apply::Flush => SetArg::TCSAFLUSH,
        };
        tcsetattr(&self.stdin, arg, attrs).map_err(io::Error::from)
    }

    fn make_raw(&self, attrs: &Termios) -> Termios {
        let mut raw = attrs.clone();
        raw.local_flags.remove(LocalFlags::ICANON | LocalFlags::ECHO);
        raw.local_flags.insert(LocalFlags::ISIG);
        raw.input_flags.remove(InputFlags::ICRNL);
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
        raw
    }
}

/// RAII guard holding the terminal in interactive mode.
pub struct RawMode<P: AttrPort> {
    port: P,
    saved: P::Attrs,
    active: bool,
}

impl<P: AttrPort> RawMode<P> {
    /// Capture the current attributes and switch to interactive mode.
    ///
    /// # Errors
    /// Fails when the attributes cannot be read or written (for example when
    /// stdin is not a terminal). No attributes are changed in that case.
    pub fn enter(mut port: P) -> Result<Self> {
        let saved = port
            .get()
            .context("failed to read terminal attributes")?;
        let raw = port.make_raw(&saved);
        port.set(&raw, Apply::Flush)
            .context("failed to enter raw terminal mode")?;
        debug!(target: "input.term", "raw_mode_enter");
        Ok(Self {
            port,
            saved,
            active: true,
        })
    }

    /// Attributes captured before interactive mode was applied.
    pub fn saved(&self) -> &P::Attrs {
        &self.saved
    }

    /// Restore the captured attributes now. Idempotent.
    ///
    /// # Errors
    /// Propagates the port's write failure; the guard stays active so drop
    /// retries once more.
    pub fn leave(&mut self) -> Result<()> {
        if self.active {
            self.port
                .set(&self.saved, Apply::Now)
                .context("failed to restore terminal attributes")?;
            self.active = false;
            debug!(target: "input.term", "raw_mode_leave");
        }
        Ok(())
    }
}

impl<P: AttrPort> Drop for RawMode<P> {
    fn drop(&mut self) {
        if let Err(err) = self.leave() {
            warn!(target: "input.term", error = %err, "raw_mode_restore_failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    struct FakeAttrs {
        canonical: bool,
        echo: bool,
    }

    #[derive(Clone)]
    struct FakePort {
        current: Rc<RefCell<FakeAttrs>>,
        /// Every successful write, in order.
        writes: Rc<RefCell<Vec<FakeAttrs>>>,
        fail_set: bool,
    }

    impl AttrPort for FakePort {
        type Attrs = FakeAttrs;

        fn get(&mut self) -> io::Result<FakeAttrs> {
            Ok(self.current.borrow().clone())
        }

        fn set(&mut self, attrs: &FakeAttrs, _when: Apply) -> io::Result<()> {
            if self.fail_set {
                return Err(io::Error::other("not a tty"));
            }
            *self.current.borrow_mut() = attrs.clone();
            self.writes.borrow_mut().push(attrs.clone());
            Ok(())
        }

        fn make_raw(&self, _attrs: &FakeAttrs) -> FakeAttrs {
            FakeAttrs {
                canonical: false,
                echo: false,
            }
        }
    }

    fn port() -> FakePort {
        FakePort {
            current: Rc::new(RefCell::new(FakeAttrs {
                canonical: true,
                echo: true,
            })),
            writes: Rc::new(RefCell::new(Vec::new())),
            fail_set: false,
        }
    }

    /// How many times `attrs` was written to the port.
    fn restores(p: &FakePort, attrs: &FakeAttrs) -> usize {
        p.writes.borrow().iter().filter(|w| *w == attrs).count()
    }

    #[test]
    fn enter_applies_raw_and_drop_restores() {
        let p = port();
        let before = p.current.borrow().clone();
        {
            let guard = RawMode::enter(p.clone()).unwrap();
            assert!(!p.current.borrow().canonical);
            assert_eq!(guard.saved(), &before);
        }
        assert_eq!(*p.current.borrow(), before);
    }

    #[test]
    fn leave_is_idempotent() {
        let p = port();
        let before = p.current.borrow().clone();
        let mut guard = RawMode::enter(p.clone()).unwrap();
        guard.leave().unwrap();
        guard.leave().unwrap();
        assert_eq!(*p.current.borrow(), before);
    }

    #[test]
    fn panic_with_live_guard_restores_once() {
        let p = port();
        let before = p.current.borrow().clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = RawMode::enter(p.clone()).unwrap();
            assert!(!p.current.borrow().canonical);
            panic!("read loop failed");
        }));
        assert!(result.is_err());
        assert_eq!(*p.current.borrow(), before);
        assert_eq!(restores(&p, &before), 1);
    }

    #[test]
    fn early_return_with_live_guard_restores_once() {
        fn next_byte() -> io::Result<u8> {
            Err(io::Error::other("input closed"))
        }

        fn read_with_guard(p: &FakePort) -> Result<()> {
            let _guard = RawMode::enter(p.clone())?;
            next_byte().context("failed to read keyboard input")?;
            Ok(())
        }

        let p = port();
        let before = p.current.borrow().clone();
        let err = read_with_guard(&p).unwrap_err();
        assert!(format!("{err:#}").contains("input closed"));
        assert_eq!(*p.current.borrow(), before);
        // one raw write on entry, one restore on the way out
        assert_eq!(p.writes.borrow().len(), 2);
        assert_eq!(restores(&p, &before), 1);
    }

    #[test]
    fn explicit_leave_then_drop_restores_once() {
        let p = port();
        let before = p.current.borrow().clone();
        let mut guard = RawMode::enter(p.clone()).unwrap();
        guard.leave().unwrap();
        drop(guard);
        assert_eq!(restores(&p, &before), 1);
    }

    #[test]
    fn setup_failure_is_an_error() {
        let mut p = port();
        p.fail_set = true;
        let err = RawMode::enter(p).err().unwrap();
        assert!(format!("{err:#}").contains("raw terminal mode"));
    }
}
