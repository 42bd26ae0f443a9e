/*!
 * Reference-Counted Vector
 */

use super::header::RcHeader;
use super::traits::RefCounted;
use std::ops::{Deref, DerefMut};

/// A `Vec<T>` that can be owned through [`SharedPtr`](super::SharedPtr)
///
/// Shares element storage between owners; use
/// [`SharedPtr::make_mut`](super::SharedPtr::make_mut) to edit a private copy.
#[derive(Debug, Clone, Default)]
pub struct RcVec<T> {
    header: RcHeader,
    items: Vec<T>,
}

impl<T> RcVec<T> {
    pub fn new() -> Self {
        Self {
            header: RcHeader::new(),
            items: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            header: RcHeader::new(),
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn into_inner(self) -> Vec<T> {
        self.items
    }
}

impl<T: 'static> RefCounted for RcVec<T> {
    fn rc_header(&self) -> &RcHeader {
        &self.header
    }
}

impl<T> From<Vec<T>> for RcVec<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            header: RcHeader::new(),
            items,
        }
    }
}

impl<T> FromIterator<T> for RcVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Vec::from_iter(iter).into()
    }
}

impl<T> Deref for RcVec<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Vec<T> {
        &self.items
    }
}

impl<T> DerefMut for RcVec<T> {
    fn deref_mut(&mut self) -> &mut Vec<T> {
        &mut self.items
    }
}

impl<T: PartialEq> PartialEq for RcVec<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}
