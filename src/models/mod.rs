pub mod common;
pub mod meeting;
pub mod past_meeting;
pub mod registrant;
pub mod webhook;
