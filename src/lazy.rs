use std::sync::{Mutex, OnceLock, PoisonError};

use crate::error::{OlapResult, OlapServiceError};

type Initializer<T> = Box<dyn Fn() -> OlapResult<T> + Send + Sync>;

/// A value built on first access and kept for the lifetime of its owner.
///
/// Initialisation is serialised by a mutex, so concurrent first accesses
/// build the value once. A failed initialiser leaves the holder empty and
/// runs again on the next access. Reads after initialisation take no lock.
pub struct InitOnce<T> {
    value: OnceLock<T>,
    init: Mutex<Option<Initializer<T>>>,
}

impl<T> InitOnce<T> {
    pub fn new<F>(init: F) -> Self
    where
        F: Fn() -> OlapResult<T> + Send + Sync + 'static,
    {
        Self {
            value: OnceLock::new(),
            init: Mutex::new(Some(Box::new(init))),
        }
    }

    pub fn ready(value: T) -> Self {
        Self {
            value: OnceLock::from(value),
            init: Mutex::new(None),
        }
    }

    pub fn get(&self) -> OlapResult<&T> {
        if let Some(value) = self.value.get() {
            return Ok(value);
        }

        let init = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(value) = self.value.get() {
            return Ok(value);
        }
        let build = init
            .as_ref()
            .ok_or_else(|| OlapServiceError::config("lazy value has no initializer"))?;
        let value = build()?;
        Ok(self.value.get_or_init(move || value))
    }

    pub fn is_initialized(&self) -> bool {
        self.value.get().is_some()
    }
}
