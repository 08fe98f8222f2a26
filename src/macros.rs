//! Crate-internal macros.

/// Statically asserts that a type is `Send` and `Sync`.
macro_rules! assert_send_and_sync {
    ( $t:ty ) => {
        const _: () = {
            const fn assert_send_and_sync<T: Send + Sync>() {}
            assert_send_and_sync::<$t>();
        };
    };
}
