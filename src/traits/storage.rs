//! Durable key/value storage surviving deep sleep and power loss.

/// Non-volatile store of unsigned integers.
///
/// Writes must be durable when `put_u32` returns; the uplink controller
/// relies on that to advance the boot counter before touching any other
/// hardware. There is no transaction across keys.
///
/// # Example
///
/// ```rust
/// use rs_conductor::traits::NonVolatileStore;
/// use rs_conductor::hal::MockStore;
///
/// let mut store = MockStore::new();
/// assert_eq!(store.get_u32("bootcount", 0).unwrap(), 0);
///
/// store.put_u32("bootcount", 7).unwrap();
/// assert_eq!(store.get_u32("bootcount", 0).unwrap(), 7);
/// ```
pub trait NonVolatileStore {
    /// Error type for storage operations.
    type Error: core::fmt::Debug;

    /// Read `key`, returning `default` when it has never been written.
    fn get_u32(&mut self, key: &str, default: u32) -> Result<u32, Self::Error>;

    /// Write `key`.
    fn put_u32(&mut self, key: &str, value: u32) -> Result<(), Self::Error>;

    /// Flush anything buffered. Called once before deep sleep.
    fn commit(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
