/*!
 * Reference Counting
 *
 * Intrusive reference counting for objects allocated through the slab:
 * - `RcHeader` embedded in each counted object
 * - `RefCounted` trait exposing the header
 * - `SharedPtr` owning one reference each
 *
 * Destruction happens when the last reference is released: registered
 * destroy callbacks see the object one last time, then it is dropped and
 * its block returned to the slab.
 */

mod header;
mod rc_vec;
mod shared_ptr;
mod traits;

pub use header::{DestroyCallback, RcHeader};
pub use rc_vec::RcVec;
pub use shared_ptr::SharedPtr;
pub use traits::{add_ref, remove_ref, AsAny, RefCounted};
