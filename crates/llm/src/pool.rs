//! Call Pools
//!
//! Two independent counting semaphores gating in-flight scoring calls.
//! `main` bounds foreground real-time analysis; `aux` bounds background
//! work to a single slot. Admission is FIFO via the semaphore's internal
//! queue, so neither pool can starve waiters of the other.

use std::sync::Arc;

use callsight_core::{CoreError, CoreResult};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use crate::types::PoolKind;

/// Default capacity of the foreground pool.
pub const DEFAULT_MAIN_POOL_SIZE: usize = 20;

/// Default capacity of the background pool.
pub const DEFAULT_AUX_POOL_SIZE: usize = 1;

/// The pair of outbound-call budgets owned by one runtime.
#[derive(Debug, Clone)]
pub struct CallPools {
    main: Arc<Semaphore>,
    aux: Arc<Semaphore>,
    main_capacity: usize,
    aux_capacity: usize,
}

impl CallPools {
    /// Create pools with explicit capacities.
    pub fn new(main_capacity: usize, aux_capacity: usize) -> Self {
        Self {
            main: Arc::new(Semaphore::new(main_capacity)),
            aux: Arc::new(Semaphore::new(aux_capacity)),
            main_capacity,
            aux_capacity,
        }
    }

    /// Acquire one slot from the given pool, waiting in FIFO order until a
    /// slot frees. The slot is released when the returned permit drops.
    pub async fn acquire(&self, kind: PoolKind) -> CoreResult<OwnedSemaphorePermit> {
        let semaphore = match kind {
            PoolKind::Main => Arc::clone(&self.main),
            PoolKind::Aux => Arc::clone(&self.aux),
        };
        let permit = semaphore
            .acquire_owned()
            .await
            .map_err(|_| CoreError::internal(format!("{} pool closed", kind)))?;
        debug!(pool = %kind, available = self.available(kind), "pool slot acquired");
        Ok(permit)
    }

    /// Slots currently free in the given pool.
    pub fn available(&self, kind: PoolKind) -> usize {
        match kind {
            PoolKind::Main => self.main.available_permits(),
            PoolKind::Aux => self.aux.available_permits(),
        }
    }

    /// Configured capacity of the given pool.
    pub fn capacity(&self, kind: PoolKind) -> usize {
        match kind {
            PoolKind::Main => self.main_capacity,
            PoolKind::Aux => self.aux_capacity,
        }
    }
}

impl Default for CallPools {
    fn default() -> Self {
        Self::new(DEFAULT_MAIN_POOL_SIZE, DEFAULT_AUX_POOL_SIZE)
    }
}
