// src/exec/reaper.rs

//! Asynchronous SIGCHLD reaper.
//!
//! The signal handler reaps every terminated child with a non-blocking
//! `waitpid(-1)` and pushes `(pid, status)` onto a fixed-size lock-free
//! queue. It takes no locks, never allocates and never logs.
//!
//! The queue and the handler are process-wide, so ownership is explicit:
//! at most one [`Reaper`] exists at a time. It is claimed by
//! [`Reaper::install`], and dropping it restores the default SIGCHLD
//! disposition and releases the claim. Only the owner pops from the queue.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};

use nix::errno::Errno;
use nix::libc;
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use thiserror::Error;

const CAPACITY: usize = 1024;

static PIDS: [AtomicI32; CAPACITY] = [const { AtomicI32::new(0) }; CAPACITY];
static STATUSES: [AtomicI32; CAPACITY] = [const { AtomicI32::new(0) }; CAPACITY];
static READY: [AtomicBool; CAPACITY] = [const { AtomicBool::new(false) }; CAPACITY];

/// Next slot to pop (consumer only).
static HEAD: AtomicUsize = AtomicUsize::new(0);
/// Next slot to claim (producers).
static TAIL: AtomicUsize = AtomicUsize::new(0);
/// Completions lost because the queue was full.
static DROPPED: AtomicUsize = AtomicUsize::new(0);

static OWNED: AtomicBool = AtomicBool::new(false);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReaperError {
    #[error("another process manager already owns the SIGCHLD reaper")]
    AlreadyOwned,

    #[error("sigaction(SIGCHLD) failed: {0}")]
    Sigaction(Errno),
}

/// A child reaped by the handler, with its raw wait status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reaped {
    pub pid: i32,
    pub status: i32,
}

/// Signal-context producer. Returns false if the queue is full.
fn push(pid: i32, status: i32) -> bool {
    loop {
        let tail = TAIL.load(Ordering::Acquire);
        let head = HEAD.load(Ordering::Acquire);
        if tail.wrapping_sub(head) >= CAPACITY {
            DROPPED.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        if TAIL
            .compare_exchange_weak(tail, tail.wrapping_add(1), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let slot = tail % CAPACITY;
            PIDS[slot].store(pid, Ordering::Relaxed);
            STATUSES[slot].store(status, Ordering::Relaxed);
            READY[slot].store(true, Ordering::Release);
            return true;
        }
    }
}

/// Reap every terminated child without blocking.
fn reap_all() {
    loop {
        let mut status: libc::c_int = 0;
        // SAFETY: waitpid is async-signal-safe and `status` is a valid out pointer.
        let pid = unsafe { libc::waitpid(-1, &mut status, libc::WNOHANG) };
        if pid <= 0 {
            break;
        }
        push(pid, status);
    }
}

/// Consumer side; callers must hold the ownership claim.
fn pop_slot() -> Option<Reaped> {
    let head = HEAD.load(Ordering::Relaxed);
    if head == TAIL.load(Ordering::Acquire) {
        return None;
    }
    let slot = head % CAPACITY;
    // A producer claimed the slot but has not finished writing it.
    if !READY[slot].load(Ordering::Acquire) {
        return None;
    }
    let reaped = Reaped {
        pid: PIDS[slot].load(Ordering::Relaxed),
        status: STATUSES[slot].load(Ordering::Relaxed),
    };
    READY[slot].store(false, Ordering::Relaxed);
    HEAD.store(head.wrapping_add(1), Ordering::Release);
    Some(reaped)
}

extern "C" fn on_sigchld(_sig: libc::c_int) {
    let saved = Errno::last_raw();
    reap_all();
    Errno::set_raw(saved);
}

fn set_handler(handler: SigHandler) -> Result<(), ReaperError> {
    let action = SigAction::new(
        handler,
        SaFlags::SA_RESTART | SaFlags::SA_NOCLDSTOP,
        SigSet::empty(),
    );
    // SAFETY: the installed handler only performs async-signal-safe work.
    unsafe { sigaction(Signal::SIGCHLD, &action) }
        .map(|_| ())
        .map_err(ReaperError::Sigaction)
}

/// Ownership token for the process-wide SIGCHLD reaper.
#[derive(Debug)]
pub struct Reaper {
    _owned: (),
}

impl Reaper {
    /// Claim the reaper and install the SIGCHLD handler.
    pub fn install() -> Result<Self, ReaperError> {
        if OWNED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ReaperError::AlreadyOwned);
        }

        // Completions left over from a previous owner belong to nobody.
        while pop_slot().is_some() {}

        if let Err(e) = set_handler(SigHandler::Handler(on_sigchld)) {
            OWNED.store(false, Ordering::Release);
            return Err(e);
        }
        Ok(Reaper { _owned: () })
    }

    /// Restore the default disposition so blocking waits own every child.
    pub fn suspend(&self) -> Result<(), ReaperError> {
        set_handler(SigHandler::SigDfl)
    }

    /// Reinstall the handler and pick up anything that exited meanwhile.
    pub fn resume(&self) -> Result<(), ReaperError> {
        set_handler(SigHandler::Handler(on_sigchld))?;
        reap_all();
        Ok(())
    }

    /// Pop the oldest reaped child, if any.
    pub fn pop(&self) -> Option<Reaped> {
        pop_slot()
    }

    /// Number of completions dropped because the queue overflowed.
    pub fn dropped(&self) -> usize {
        DROPPED.load(Ordering::Relaxed)
    }
}

impl Drop for Reaper {
    fn drop(&mut self) {
        let _ = set_handler(SigHandler::SigDfl);
        OWNED.store(false, Ordering::Release);
    }
}
