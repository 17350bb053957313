// src/action/resources.rs

//! Declared resource needs of an action and the accounting helper a
//! scheduler uses to admit actions against a local budget.
//!
//! Nothing here enforces OS-level limits. A [`ResourceSet`] is a truthful,
//! stable *declaration*; [`ResourceBudget`] only does bookkeeping.

use std::ops::Add;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Notify;
use tracing::trace;

use crate::errors::{GenspawnError, Result};

/// Memory (MB), CPU (fraction of one core, may exceed 1.0) and I/O (fraction
/// of total bandwidth) an action instance is expected to consume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceSet {
    memory_mb: f64,
    cpu_usage: f64,
    io_usage: f64,
}

impl ResourceSet {
    pub const ZERO: ResourceSet = ResourceSet::new(0.0, 0.0, 0.0);

    /// Construct a resource set for a constant.
    ///
    /// Panics (at compile time when used in a `const`) if any value is
    /// negative or not finite. Use [`try_new`](Self::try_new) for values that
    /// come from user input.
    pub const fn new(memory_mb: f64, cpu_usage: f64, io_usage: f64) -> Self {
        assert!(
            memory_mb.is_finite() && memory_mb >= 0.0,
            "memory_mb must be finite and non-negative"
        );
        assert!(
            cpu_usage.is_finite() && cpu_usage >= 0.0,
            "cpu_usage must be finite and non-negative"
        );
        assert!(
            io_usage.is_finite() && io_usage >= 0.0,
            "io_usage must be finite and non-negative"
        );
        Self {
            memory_mb,
            cpu_usage,
            io_usage,
        }
    }

    pub fn try_new(memory_mb: f64, cpu_usage: f64, io_usage: f64) -> Result<Self> {
        for (name, value) in [
            ("memory_mb", memory_mb),
            ("cpu", cpu_usage),
            ("io", io_usage),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(GenspawnError::InvalidResources(format!(
                    "{name} must be finite and non-negative (got {value})"
                )));
            }
        }
        Ok(Self {
            memory_mb,
            cpu_usage,
            io_usage,
        })
    }

    pub fn memory_mb(&self) -> f64 {
        self.memory_mb
    }

    pub fn cpu_usage(&self) -> f64 {
        self.cpu_usage
    }

    pub fn io_usage(&self) -> f64 {
        self.io_usage
    }

    /// True if every component of `self` is at most the same component of `other`.
    pub fn fits_within(&self, other: &ResourceSet) -> bool {
        self.memory_mb <= other.memory_mb
            && self.cpu_usage <= other.cpu_usage
            && self.io_usage <= other.io_usage
    }

    /// Component-wise subtraction, clamped at zero.
    pub fn saturating_sub(&self, other: &ResourceSet) -> ResourceSet {
        ResourceSet {
            memory_mb: (self.memory_mb - other.memory_mb).max(0.0),
            cpu_usage: (self.cpu_usage - other.cpu_usage).max(0.0),
            io_usage: (self.io_usage - other.io_usage).max(0.0),
        }
    }
}

impl Default for ResourceSet {
    fn default() -> Self {
        ResourceSet::ZERO
    }
}

impl Add for ResourceSet {
    type Output = ResourceSet;

    fn add(self, rhs: ResourceSet) -> ResourceSet {
        ResourceSet {
            memory_mb: self.memory_mb + rhs.memory_mb,
            cpu_usage: self.cpu_usage + rhs.cpu_usage,
            io_usage: self.io_usage + rhs.io_usage,
        }
    }
}

#[derive(Debug)]
struct BudgetState {
    total: ResourceSet,
    in_use: ResourceSet,
    leases: usize,
}

/// Shared, thread-safe accounting of a local resource budget.
///
/// Admission rule: a request is granted when it fits in what is left of the
/// budget, or when nothing else is currently held. The second clause lets an
/// action that declares more than the whole budget still run, alone.
#[derive(Debug, Clone)]
pub struct ResourceBudget {
    state: Arc<Mutex<BudgetState>>,
    released: Arc<Notify>,
}

impl ResourceBudget {
    pub fn new(total: ResourceSet) -> Self {
        Self {
            state: Arc::new(Mutex::new(BudgetState {
                total,
                in_use: ResourceSet::ZERO,
                leases: 0,
            })),
            released: Arc::new(Notify::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BudgetState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn total(&self) -> ResourceSet {
        self.lock().total
    }

    pub fn in_use(&self) -> ResourceSet {
        self.lock().in_use
    }

    /// Number of outstanding leases.
    pub fn active_leases(&self) -> usize {
        self.lock().leases
    }

    /// Try to reserve `request`. The reservation lasts until the returned
    /// lease is dropped.
    pub fn try_acquire(&self, request: &ResourceSet) -> Option<ResourceLease> {
        let mut state = self.lock();
        let wanted = state.in_use + *request;
        if state.leases > 0 && !wanted.fits_within(&state.total) {
            trace!(?request, in_use = ?state.in_use, "resource request deferred");
            return None;
        }
        state.in_use = wanted;
        state.leases += 1;
        Some(ResourceLease {
            budget: self.clone(),
            held: *request,
        })
    }

    /// Wait until `request` can be reserved.
    pub async fn acquire(&self, request: &ResourceSet) -> ResourceLease {
        loop {
            // Register before checking so a release in between is not missed.
            let released = self.released.notified();
            if let Some(lease) = self.try_acquire(request) {
                return lease;
            }
            released.await;
        }
    }

    fn release(&self, held: &ResourceSet) {
        let mut state = self.lock();
        state.leases = state.leases.saturating_sub(1);
        state.in_use = if state.leases == 0 {
            ResourceSet::ZERO
        } else {
            state.in_use.saturating_sub(held)
        };
        drop(state);
        self.released.notify_waiters();
    }
}

/// Reservation against a [`ResourceBudget`]; released on drop.
#[derive(Debug)]
pub struct ResourceLease {
    budget: ResourceBudget,
    held: ResourceSet,
}

impl ResourceLease {
    pub fn resources(&self) -> ResourceSet {
        self.held
    }
}

impl Drop for ResourceLease {
    fn drop(&mut self) {
        self.budget.release(&self.held);
    }
}
