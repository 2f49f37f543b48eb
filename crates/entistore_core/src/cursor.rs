//! Lazy, forward-only result iterators.

use crate::error::{StoreError, StoreResult};
use entistore_client::{ClientResult, Cursor};
use entistore_codec::{from_document, from_value, Document, Value};
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::fmt;
use std::marker::PhantomData;

/// Flattens a batch cursor into single items.
///
/// The underlying cursor is released as soon as it is exhausted or fails,
/// and in any case when this value is dropped.
struct Batches<I> {
    cursor: Option<Box<dyn Cursor<I>>>,
    buffer: VecDeque<I>,
}

impl<I> Batches<I> {
    fn new(cursor: Box<dyn Cursor<I>>) -> Self {
        Self {
            cursor: Some(cursor),
            buffer: VecDeque::new(),
        }
    }

    fn next_item(&mut self) -> Option<ClientResult<I>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }
            let cursor = self.cursor.as_mut()?;
            match cursor.next_batch() {
                Ok(Some(batch)) => self.buffer.extend(batch),
                Ok(None) => {
                    self.cursor = None;
                    return None;
                }
                Err(err) => {
                    self.cursor = None;
                    return Some(Err(err));
                }
            }
        }
    }

    fn is_open(&self) -> bool {
        self.cursor.is_some()
    }
}

/// Entities matching a query, fetched batch by batch.
///
/// Finite and single-pass. Dropping the cursor early releases it.
pub struct EntityCursor<T> {
    batches: Batches<Document>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> EntityCursor<T> {
    pub(crate) fn new(cursor: Box<dyn Cursor<Document>>) -> Self {
        Self {
            batches: Batches::new(cursor),
            _entity: PhantomData,
        }
    }

    /// Whether the underlying store cursor is still held.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.batches.is_open()
    }
}

impl<T: DeserializeOwned> Iterator for EntityCursor<T> {
    type Item = StoreResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(match self.batches.next_item()? {
            Ok(doc) => from_document(&doc).map_err(StoreError::from),
            Err(err) => Err(StoreError::from(err)),
        })
    }
}

impl<T> fmt::Debug for EntityCursor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityCursor")
            .field("open", &self.is_open())
            .field("buffered", &self.batches.buffer.len())
            .finish()
    }
}

/// De-duplicated values of one field, fetched batch by batch.
pub struct Distinct<F> {
    batches: Batches<Value>,
    _field: PhantomData<fn() -> F>,
}

impl<F> Distinct<F> {
    pub(crate) fn new(cursor: Box<dyn Cursor<Value>>) -> Self {
        Self {
            batches: Batches::new(cursor),
            _field: PhantomData,
        }
    }

    /// Whether the underlying store cursor is still held.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.batches.is_open()
    }
}

impl<F: DeserializeOwned> Iterator for Distinct<F> {
    type Item = StoreResult<F>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(match self.batches.next_item()? {
            Ok(value) => from_value(&value).map_err(StoreError::from),
            Err(err) => Err(StoreError::from(err)),
        })
    }
}

impl<F> fmt::Debug for Distinct<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Distinct")
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}
