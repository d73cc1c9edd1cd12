// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Fixed-capacity arena indexed directly by handle value.

use std::marker::PhantomData;

use crate::handle::Handle;
use crate::renderer::error::ResourceError;

#[derive(Debug)]
enum Slot<T> {
    Vacant,
    Occupied(T),
    /// Destroyed. Handles never recycle, so the slot stays unusable.
    Retired,
}

/// Backend storage for one resource kind.
///
/// Objects live at the numeric index of their handle. Slots are only touched
/// during replay, in command order.
#[derive(Debug)]
pub struct ResourceTable<H: Handle, T> {
    slots: Vec<Slot<T>>,
    capacity: usize,
    live: usize,
    _marker: PhantomData<H>,
}

impl<H: Handle, T> ResourceTable<H, T> {
    /// Creates a table holding at most `capacity` objects.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            capacity,
            live: 0,
            _marker: PhantomData,
        }
    }

    /// Stores `value` at `handle`'s index.
    pub fn insert(&mut self, handle: H, value: T) -> Result<(), ResourceError> {
        let index = self.checked_index(handle)?;
        if index >= self.capacity {
            return Err(ResourceError::CapacityExceeded {
                kind: H::KIND,
                capacity: self.capacity,
            });
        }
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || Slot::Vacant);
        }
        match &self.slots[index] {
            Slot::Vacant => {}
            Slot::Occupied(_) => {
                return Err(ResourceError::AlreadyExists {
                    kind: H::KIND,
                    index: handle.raw(),
                })
            }
            Slot::Retired => return Err(Self::destroyed(handle)),
        }
        self.slots[index] = Slot::Occupied(value);
        self.live += 1;
        Ok(())
    }

    /// The object at `handle`.
    pub fn get(&self, handle: H) -> Result<&T, ResourceError> {
        let index = self.checked_index(handle)?;
        match self.slots.get(index) {
            Some(Slot::Occupied(value)) => Ok(value),
            Some(Slot::Retired) => Err(Self::destroyed(handle)),
            _ => Err(Self::not_found(handle)),
        }
    }

    /// The object at `handle`, mutably.
    pub fn get_mut(&mut self, handle: H) -> Result<&mut T, ResourceError> {
        let index = self.checked_index(handle)?;
        match self.slots.get_mut(index) {
            Some(Slot::Occupied(value)) => Ok(value),
            Some(Slot::Retired) => Err(Self::destroyed(handle)),
            _ => Err(Self::not_found(handle)),
        }
    }

    /// Takes the object out and retires the slot.
    pub fn remove(&mut self, handle: H) -> Result<T, ResourceError> {
        let index = self.checked_index(handle)?;
        let slot = match self.slots.get_mut(index) {
            Some(slot) => slot,
            None => return Err(Self::not_found(handle)),
        };
        match std::mem::replace(slot, Slot::Retired) {
            Slot::Occupied(value) => {
                self.live -= 1;
                Ok(value)
            }
            Slot::Retired => Err(Self::destroyed(handle)),
            Slot::Vacant => {
                *slot = Slot::Vacant;
                Err(Self::not_found(handle))
            }
        }
    }

    /// `true` if an object lives at `handle`.
    pub fn contains(&self, handle: H) -> bool {
        self.get(handle).is_ok()
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.live
    }

    /// `true` if the table holds no live object.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Maximum number of objects.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterates over live objects.
    pub fn iter(&self) -> impl Iterator<Item = (H, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Slot::Occupied(value) => Some((H::from_raw(index as u16), value)),
                _ => None,
            })
    }

    /// Removes every object, leaving the table empty and reusable.
    pub fn drain(&mut self) -> impl Iterator<Item = (H, T)> + '_ {
        self.live = 0;
        self.slots
            .drain(..)
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Slot::Occupied(value) => Some((H::from_raw(index as u16), value)),
                _ => None,
            })
    }

    fn checked_index(&self, handle: H) -> Result<usize, ResourceError> {
        if handle.is_null() {
            return Err(ResourceError::InvalidHandle { kind: H::KIND });
        }
        Ok(handle.index())
    }

    fn not_found(handle: H) -> ResourceError {
        ResourceError::NotFound {
            kind: H::KIND,
            index: handle.raw(),
        }
    }

    fn destroyed(handle: H) -> ResourceError {
        ResourceError::Destroyed {
            kind: H::KIND,
            index: handle.raw(),
        }
    }
}
