pub mod lifecycle;
pub mod occurrences;
pub mod reconciler;
pub mod recurrence;
pub mod rsvp;
pub mod store;

#[cfg(test)]
mod occurrences_test;
#[cfg(test)]
mod recurrence_test;
#[cfg(test)]
mod rsvp_test;
