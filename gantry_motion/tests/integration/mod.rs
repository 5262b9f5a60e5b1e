mod common;

mod backoff;
mod homing;
mod motion;
mod register_props;
mod wash;
