//! Capability marker for in-place decoding.

use serde::de::DeserializeOwned;

/// Types that can be decoded repeatedly into one long-lived instance.
///
/// Handler methods taking `&T` where `T: ReadMarshallable` get a single
/// instance, built once with [`Default`], that every record is decoded into.
/// Methods taking `T` by value get a fresh instance per record instead.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Debug, Default, Deserialize)]
/// #[serde(default)]
/// struct Tick {
///     symbol: String,
///     price: f64,
/// }
///
/// impl ReadMarshallable for Tick {
///     fn reset(&mut self) {
///         self.symbol.clear();
///         self.price = 0.0;
///     }
/// }
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be decoded in place",
    label = "missing `ReadMarshallable` implementation",
    note = "Take the argument by value to decode a fresh instance per record instead."
)]
pub trait ReadMarshallable: DeserializeOwned + Default + Send + 'static {
    /// Return every field to its default before the next decode.
    ///
    /// Override to clear buffers while keeping their capacity.
    fn reset(&mut self) {
        *self = Self::default();
    }
}

impl ReadMarshallable for String {
    fn reset(&mut self) {
        self.clear();
    }
}

impl<T: DeserializeOwned + Send + 'static> ReadMarshallable for Vec<T> {
    fn reset(&mut self) {
        self.clear();
    }
}
