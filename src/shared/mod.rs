//! Sharing one driver between the main loop and an interrupt handler.
//!
//! The ZNP pulls SRDY low whenever it has an unsolicited frame queued. Wiring
//! that falling edge (or a periodic timer) to [`global_znp_poll`] collects the
//! frames as soon as they arrive, while the main loop reaches the same driver
//! through [`global_znp_with`]. Both go through `critical_section::with`.
//!
//! The closure passed to [`global_znp_with`] runs with the critical section
//! held. Release the driver with [`global_znp_release`] before commissioning,
//! resetting or starting the device, and set it up again afterwards.
//!
//! Contains:
//! - `global_znp_init`: const initializer for the global static
//! - `global_znp_setup` / `global_znp_release`: install and take back a driver
//! - `global_znp_poll` and `poll_znp!()`: poll-loop callback for the ISR
//! - `global_znp_with`: run a closure against the installed driver
//! - `init_znp_driver!()` / `setup_znp_driver!()`: declare and fill a `ZNP_DRIVER` static

mod isr;
pub use isr::*;

mod macros;
