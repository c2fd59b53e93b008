use core::cell::RefCell;
use critical_section::Mutex;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiBus;

use crate::driver::ZnpDriver;
use crate::error::Result;

/// A driver slot guarded by a `critical_section` mutex.
pub type SharedZnp<SPI, MRDY, SRDY, RST, D> =
    Mutex<RefCell<Option<ZnpDriver<SPI, MRDY, SRDY, RST, D>>>>;

/// Initializes an empty global driver slot.
///
/// # Example
/// ```ignore
/// static ZNP: SharedZnp<Spi, PA4, PA3, PA2, Delay> = global_znp_init();
/// ```
pub const fn global_znp_init<SPI, MRDY, SRDY, RST, D>() -> SharedZnp<SPI, MRDY, SRDY, RST, D> {
    Mutex::new(RefCell::new(None))
}

/// Installs `driver` in the global slot, replacing any previous one.
pub fn global_znp_setup<SPI, MRDY, SRDY, RST, D>(
    global: &'static SharedZnp<SPI, MRDY, SRDY, RST, D>,
    driver: ZnpDriver<SPI, MRDY, SRDY, RST, D>,
) {
    critical_section::with(|cs| {
        let _ = global.borrow(cs).replace(Some(driver));
    });
}

/// Removes the driver from the global slot and hands it back.
///
/// The slot stays empty until the next [`global_znp_setup`], so an ISR
/// calling [`global_znp_poll`] in the meantime does nothing.
pub fn global_znp_release<SPI, MRDY, SRDY, RST, D>(
    global: &'static SharedZnp<SPI, MRDY, SRDY, RST, D>,
) -> Option<ZnpDriver<SPI, MRDY, SRDY, RST, D>> {
    critical_section::with(|cs| global.borrow(cs).take())
}

/// Runs the poll loop on the installed driver.
///
/// # Returns
/// - `None` if no driver has been set up yet, otherwise the result of
///   [`ZnpDriver::poll`].
///
/// # Example
/// ```ignore
/// #[interrupt]
/// fn EXTI3() {
///     let _ = global_znp_poll(&ZNP);
/// }
/// ```
pub fn global_znp_poll<SPI, MRDY, SRDY, RST, D>(
    global: &'static SharedZnp<SPI, MRDY, SRDY, RST, D>,
) -> Option<Result<usize>>
where
    SPI: SpiBus<u8>,
    MRDY: OutputPin,
    SRDY: InputPin,
    RST: OutputPin,
    D: DelayNs,
{
    global_znp_with(global, |driver| driver.poll())
}

/// Runs `f` with exclusive access to the installed driver.
///
/// `f` runs inside the critical section, so interrupts stay masked on most
/// targets until it returns. Keep it short: a poll or a single request.
///
/// # Returns
/// - `None` if no driver has been set up yet.
///
/// # Notes
/// - Long operations such as [`ZnpDriver::commission`], the resets and
///   [`ZnpDriver::startup_from_app`] wait for seconds. Take the driver out
///   with [`global_znp_release`], run them, then install it again with
///   [`global_znp_setup`].
pub fn global_znp_with<SPI, MRDY, SRDY, RST, D, R>(
    global: &'static SharedZnp<SPI, MRDY, SRDY, RST, D>,
    f: impl FnOnce(&mut ZnpDriver<SPI, MRDY, SRDY, RST, D>) -> R,
) -> Option<R> {
    critical_section::with(|cs| global.borrow(cs).borrow_mut().as_mut().map(f))
}
