/*!
 * Object Handles
 *
 * Reference-counted, lock-guarded owners of domain values:
 * - `Handle<T>`: one value, one reader/writer lock, one slab block
 * - `ObjectHandle<B>`: the same handle seen at base level `B`
 * - `Derives` / `FromBase`: is-a relations between domain types
 *
 * # Access
 *
 * Reads and edits go through guards borrowed from the handle. A handle is
 * shared cheaply through `SharedPtr` and copied on first mutation with the
 * copy-on-write helpers.
 */

mod cow;
mod hierarchy;
mod holder;
mod lifecycle;
mod object;

pub use cow::clone_shared;
pub use hierarchy::{Derives, FromBase, ObjectHandle};
pub use lifecycle::HandleState;
pub use object::Handle;
