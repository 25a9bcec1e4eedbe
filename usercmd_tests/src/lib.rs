/*! # Usercmd Tests

Headless [`Stepper`](stepper::Stepper) used to run the usercmd plugins frame by frame in
integration tests.
*/

extern crate alloc;

pub mod protocol;
pub mod stepper;

#[cfg(test)]
mod lag_compensation;
#[cfg(test)]
mod observer;
#[cfg(test)]
mod pipeline;
