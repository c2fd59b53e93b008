/// Declares a static global `ZNP_DRIVER` slot protected by a `critical_section` mutex.
///
/// # Arguments
/// - `$spi`: the SPI bus type (must implement `SpiBus<u8>`)
/// - `$mrdy`: the MRDY pin type (must implement `OutputPin`)
/// - `$srdy`: the SRDY pin type (must implement `InputPin`)
/// - `$rst`: the reset pin type (must implement `OutputPin`)
/// - `$delay`: the delay provider type (must implement `DelayNs`)
///
/// # Example
/// ```ignore
/// init_znp_driver!(Spi1, PA4, PA3, PA2, Delay);
/// ```
#[macro_export]
macro_rules! init_znp_driver {
    ( $spi:ty, $mrdy:ty, $srdy:ty, $rst:ty, $delay:ty ) => {
        pub static ZNP_DRIVER: $crate::shared::SharedZnp<$spi, $mrdy, $srdy, $rst, $delay> =
            $crate::shared::global_znp_init();
    };
}

/// Installs a driver in the `ZNP_DRIVER` slot declared by `init_znp_driver!`.
///
/// # Example
/// ```ignore
/// setup_znp_driver!(ZnpDriver::new(spi, mrdy, srdy, Some(rst), delay));
/// ```
#[macro_export]
macro_rules! setup_znp_driver {
    ( $driver:expr ) => {
        $crate::shared::global_znp_setup(&ZNP_DRIVER, $driver)
    };
}

/// Runs the poll loop on `ZNP_DRIVER`, if it has been set up.
///
/// Expands to an `Option<Result<usize>>`.
///
/// # Example
/// ```ignore
/// #[interrupt]
/// fn EXTI3() {
///     let _ = poll_znp!();
/// }
/// ```
#[macro_export]
macro_rules! poll_znp {
    () => {
        $crate::shared::global_znp_poll(&ZNP_DRIVER)
    };
}
