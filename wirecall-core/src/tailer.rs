//! # Scoped Record Reads
//!
//! A tailer hands out one [`DocumentContext`] per read. The context is the
//! scope of the read: it exposes the record while alive and releases it when
//! dropped, on every path out of the caller.

use crate::wire::Wire;

/// One scoped read over the next record.
///
/// Dropping the context releases the read. Implementations that advance
/// their position do so on drop, whether or not the record was handled
/// successfully.
pub trait DocumentContext {
    /// True if a record was available when the scope was opened.
    fn is_data(&self) -> bool;

    /// A read cursor over the record, or `None` if there is no data.
    fn wire(&self) -> Option<Wire<'_>>;
}

/// A source of records read in sequence.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot supply records",
    label = "missing `ExcerptTailer` implementation",
    note = "Implement `reading_document` to open a scoped read over the next record."
)]
pub trait ExcerptTailer {
    /// The scoped read handed out by [`reading_document`](Self::reading_document).
    type Document<'a>: DocumentContext
    where
        Self: 'a;

    /// Open a scoped read over the next record.
    ///
    /// May block if the underlying log does; returns a context whose
    /// [`is_data`](DocumentContext::is_data) is false when nothing is ready.
    fn reading_document(&mut self) -> Self::Document<'_>;
}

impl<T: ExcerptTailer + ?Sized> ExcerptTailer for &mut T {
    type Document<'a>
        = T::Document<'a>
    where
        Self: 'a;

    fn reading_document(&mut self) -> Self::Document<'_> {
        (**self).reading_document()
    }
}
