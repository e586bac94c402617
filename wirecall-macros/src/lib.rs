use proc_macro::TokenStream;

mod methods;

/// Generate a `MethodHandlers` implementation from an `impl` block.
///
/// Every method taking `&self` and exactly one argument is registered under
/// its own name. Arguments taken by value are decoded fresh for every record;
/// arguments taken as `&T` are decoded in place into one reused `T`, which
/// must implement `ReadMarshallable`.
///
/// Associated functions, `&mut self` or `self` receivers, `async`, `unsafe`
/// and generic methods are left alone. So are methods whose argument is
/// `Self` or `&Self` (or the implementing type itself) or any `&mut T`, and
/// every method of a `PartialEq`, `Eq`, `PartialOrd`, `Ord`, `Hash`,
/// `Debug`, `Display` or `Clone` impl.
///
/// # Attributes
///
/// - `#[methods(default_handler)]`: the type also implements
///   `DefaultHandler` and is installed as the fallback when supplied first.
/// - `#[wirecall(skip)]` on a method: do not register it.
/// - `#[wirecall(name = "...")]` on a method: register it under another name.
///
/// # Example
///
/// ```rust,ignore
/// #[wirecall::methods]
/// impl Ledger {
///     fn deposit(&self, deposit: Deposit) {
///         self.total.fetch_add(deposit.amount, Ordering::SeqCst);
///     }
///
///     fn tick(&self, tick: &Tick) -> Result<(), LedgerError> {
///         self.check(tick)
///     }
///
///     #[wirecall(skip)]
///     fn check(&self, tick: &Tick) -> Result<(), LedgerError> { .. }
/// }
/// ```
///
/// Annotate at most one `impl` block per type.
#[proc_macro_attribute]
pub fn methods(attr: TokenStream, item: TokenStream) -> TokenStream {
    methods::methods_impl(attr, item)
}
